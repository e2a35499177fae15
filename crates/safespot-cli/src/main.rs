//! SafeSpot CLI Entry Point

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use safespot_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => safespot_cli::guard::run(args).await?,
        Commands::Contacts(args) => safespot_cli::guard::contacts(args).await?,
        Commands::Classify(args) => safespot_cli::guard::classify(args).await?,
        Commands::AlertPreview(args) => safespot_cli::guard::alert_preview(args)?,
        Commands::Version => {
            println!("safespot {}", env!("CARGO_PKG_VERSION"));
            println!("guard library version: {}", safespot_guard::VERSION);
        }
    }

    Ok(())
}
