use clap::Parser;
use tokio_util::sync::CancellationToken;

use frost_rs::cli::{Cli, execute_command, init_logger_from_settings, load_settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    init_logger_from_settings(&settings)?;

    tracing::info!(
        app = %settings.application.name,
        version = %settings.application.version,
        "Starting"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        }
    });

    execute_command(&cli, settings, shutdown).await?;
    Ok(())
}
