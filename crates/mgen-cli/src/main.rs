//! Process-bootstrap shim. The agent has no CLI surface of its own — it is
//! embedded and driven by the browser-automation host runtime — so this
//! binary only loads configuration, initialises logging, and reports what a
//! run would use.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "mgen-cli")]
#[command(about = "MGEN member-portal extraction agent bootstrap")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the effective configuration (secrets redacted).
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = mgen_core::load_app_config_from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Config) | None => {
            tracing::info!(?config, "agent configuration loaded");
            println!("{config:#?}");
        }
    }

    Ok(())
}
