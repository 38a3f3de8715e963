//! Stop-limit price watcher - Entry Point

use anyhow::Result;
use clap::Parser;
use stoplimit_bot::{exit_code, render, AppConfig, Application, Args};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // .env is optional
    dotenv::dotenv().ok();

    stoplimit_telemetry::init_logging()?;

    info!("Starting stoplimit-bot v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config_path();
    let mut config = match config_path.as_deref() {
        Some(path) => {
            info!(config_path = %path, "Loading configuration");
            AppConfig::from_file(path)?
        }
        None => AppConfig::default(),
    };
    args.apply_overrides(&mut config);

    let requests = args.watch_requests(&config)?;
    let app = Application::new(config, requests)?;
    let reports = app.run().await?;

    for report in &reports {
        println!("{}", render(report)?);
    }

    if args.print_metrics {
        eprintln!("{}", stoplimit_telemetry::gather_text()?);
    }

    std::process::exit(exit_code(&reports));
}
