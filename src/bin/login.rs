//! Registers the app and signs in with the code Telegram sends to the phone.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tgclient::{Client, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tgclient=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let client = Client::from_config(&config).context("Failed to build client")?;

    info!("Registering app '{}'", config.app.name);
    client
        .register_app()
        .await
        .context("Failed to register app")?;

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Enter the code received on your phone: ")
        .await?;
    stdout.flush().await?;

    let mut stdin = BufReader::new(tokio::io::stdin());
    client
        .enter_code(&mut stdin)
        .await
        .context("Sign-in failed")?;

    println!("Signed in as {}", config.phone_or_token());
    Ok(())
}
