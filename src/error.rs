//! Errors surfaced to the binary

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no flags provided, please use --help for more information")]
    NoFlags,

    #[error("invalid arguments: {0}")]
    Args(#[from] clap::Error),

    #[error("failed to load config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
