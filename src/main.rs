// src/main.rs

use std::process::ExitCode;

use ingest_config::errors::ConfigError;
use ingest_config::{cli, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    match run_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Config errors already read as operator instructions; anything
            // else gets the full context chain.
            match err.downcast_ref::<ConfigError>() {
                Some(config_err) => eprintln!("ingest-config: {config_err}"),
                None => eprintln!("ingest-config error: {err:?}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
