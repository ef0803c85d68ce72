use proxy_registry::{cli, logging, Registry, RegistryConfig, RegistryError};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();

    let cli = match cli::parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(RegistryError::Args(e)) => e.exit(),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = match &cli.config {
        Some(path) => match RegistryConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => RegistryConfig::default(),
    };

    if !cli.update {
        info!("nothing to do; pass --update to refresh the lists");
        return ExitCode::SUCCESS;
    }

    let registry = Registry::new(config);
    match registry.update().await {
        Ok(summary) => {
            println!(
                "Validated {} proxies from {} candidates ({} sources ok, {} failed)",
                summary.validated, summary.candidates, summary.sources_ok, summary.sources_failed
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("update failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
