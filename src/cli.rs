//! Command-line surface

use crate::error::RegistryError;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// Aggregates public proxy lists and keeps a validated registry of working proxies
#[derive(Debug, Parser)]
#[command(name = "proxy-registry")]
#[command(about = "Aggregates public proxy lists and keeps a validated registry of working proxies")]
pub struct Cli {
    /// Scrape, validate and rewrite the proxy lists
    #[arg(long)]
    pub update: bool,

    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Parse process arguments
///
/// Having no flags at all is an error. Single-dash long flags such as
/// `-update` are accepted as their `--` form.
pub fn parse_args<I, T>(args: I) -> Result<Cli, RegistryError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.len() <= 1 {
        return Err(RegistryError::NoFlags);
    }

    let args = args.into_iter().enumerate().map(|(i, arg)| {
        if i == 0 {
            return arg;
        }
        match arg.to_str() {
            Some("-update") => OsString::from("--update"),
            Some(s) if s.starts_with("-config") => OsString::from(format!("-{}", s)),
            _ => arg,
        }
    });

    Ok(Cli::try_parse_from(args)?)
}
