mod config;
mod digest;
mod serve;
mod telegram;

use clap::Parser;
use config::{Cli, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    dotenv::dotenv().ok();

    // Initialize tracing; porfiry-core's `log` records are bridged in.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let settings = Settings::resolve(Cli::parse())?;
    settings.validate()?;

    serve::run(settings).await
}
