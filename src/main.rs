use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use releasepost::config::{AppConfig, Cli};
use releasepost::runner::{self, GenerationResult};
use std::env;
use std::io;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse the specified (or default) .env file
    let dotenv_path =
        env::var("RELEASEPOST_DOTENV_PATH").unwrap_or_else(|_| ".env".to_string());
    let dotenv_result = dotenvy::from_path(&dotenv_path);

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match dotenv_result {
        Ok(()) => log::info!("Loaded env from {}", dotenv_path),
        Err(err) => log::debug!("No .env loaded from {}: {}", dotenv_path, err),
    }

    let cli = Cli::parse();
    match generate(cli).await {
        Ok(output) => match output.emit(io::stdout().lock()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                log::error!("Writing output: {}", err);
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            log::error!("{:?}", err);
            let _ = runner::emit_failure(io::stdout().lock());
            ExitCode::FAILURE
        }
    }
}

async fn generate(cli: Cli) -> anyhow::Result<GenerationResult> {
    let config = AppConfig::from_env()
        .context("Reading configuration")?
        .with_overrides(cli);
    log::info!(
        "mode: {:?}, release: {}, format: {}",
        config.mode(),
        config.release_tag,
        config.output_format
    );
    Ok(runner::run(&config).await?)
}
