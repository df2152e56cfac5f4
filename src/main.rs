use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tgclient::{Client, Config, Filter, Listener, Message, PollOutcome};

const HELP_TEXT: &str = "Hello! I echo back whatever you send me.\n\n\
     Commands:\n\
     /start - Show this message\n\
     /help - Show this message\n\
     /whoami - Show what I know about this chat";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tgclient=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  API: {}", config.api.effective_base_url());
    info!("  Long-poll timeout: {}s", config.polling.timeout_secs);
    info!("  Retries on transport error: {}", config.polling.max_retries);

    let client = Arc::new(Client::from_config(&config).context("Failed to build client")?);

    let me = client
        .get_me()
        .await
        .context("Failed to verify bot token with getMe")?;
    info!(
        "Authorized as {} (@{})",
        me.first_name,
        me.username.as_deref().unwrap_or("-")
    );

    let poller = client
        .updates(config.polling.clone())
        .with_listener(reply_with(
            client.clone(),
            Filter::pattern(r"^/(start|help)(@\w+)?$")?,
            |_| HELP_TEXT.to_string(),
        ))
        .with_listener(whoami_listener(client.clone()))
        .with_listener(reply_with(
            client.clone(),
            Filter::custom(|m| m.text.as_deref().is_some_and(|t| !t.starts_with('/'))),
            |m| m.text.clone().unwrap_or_default(),
        ));

    let handle = Arc::new(poller).spawn();
    let cancel = handle.cancel_token();

    info!("Bot is polling, press Ctrl-C to stop");
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            cancel.cancel();
        }
    });

    match handle.join().await.context("Update polling failed")? {
        PollOutcome::Cancelled => info!("Stopped"),
        PollOutcome::AlreadyPolling => info!("Polling was already running"),
    }

    Ok(())
}

/// Listener that answers a matching message with `render(message)`
fn reply_with<F>(client: Arc<Client>, filter: Filter, render: F) -> Listener
where
    F: Fn(&Message) -> String + Send + Sync + 'static,
{
    let render = Arc::new(render);
    Listener::new(filter, move |msg: Message| {
        let client = client.clone();
        let render = render.clone();
        async move {
            let text = render(&msg);
            if let Err(e) = client.send_message(msg.chat.id, &text).await {
                error!("Failed to reply in chat {}: {}", msg.chat.id, e);
            }
        }
    })
}

fn whoami_listener(client: Arc<Client>) -> Listener {
    Listener::on_command("whoami", move |msg: Message| {
        let client = client.clone();
        async move {
            let text = match client.get_entity(msg.chat.id).await {
                Ok(entity) => format!("{:?}", entity),
                Err(e) => format!("Error: {}", e),
            };
            if let Err(e) = client.send_message(msg.chat.id, &text).await {
                error!("Failed to reply in chat {}: {}", msg.chat.id, e);
            }
        }
    })
}
