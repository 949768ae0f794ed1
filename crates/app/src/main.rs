use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rdv_app::booking_page::PageOptions;
use rdv_app::config::AppConfig;
use rdv_app::terminal::{parse_args, parse_command, Outcome, Session};
use rdv_client::{BookingApi, FileStorage, MemoryStorage, Storage, AUTH_TOKEN_KEY};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing (stderr, so it does not interleave with the UI) ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rdv_app=debug,rdv_client=debug,rdv_events=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // --- Configuration ---
    let config = AppConfig::from_env()?;
    let seed = parse_args(std::env::args().skip(1))?;
    tracing::info!(
        api_base_url = %config.api_base_url,
        storage = ?config.storage_path,
        "Loaded client configuration"
    );

    // --- Storage ---
    let storage: Arc<dyn Storage> = match &config.storage_path {
        Some(path) => Arc::new(FileStorage::open(path)?),
        None => Arc::new(MemoryStorage::new()),
    };
    if let Some(token) = &config.auth_token {
        storage.set(AUTH_TOKEN_KEY, token)?;
        tracing::info!("Auth token seeded from environment");
    }

    // --- Backend client ---
    let api = match config.request_timeout {
        Some(timeout) => {
            BookingApi::with_timeout(&config.api_base_url, Arc::clone(&storage), timeout)?
        }
        None => BookingApi::new(&config.api_base_url, Arc::clone(&storage)),
    };

    // --- Session ---
    let options = PageOptions::local(&config.default_avatar_url);
    let mut session = Session::new(Arc::new(api), storage, options);

    let mut stdout = tokio::io::stdout();
    let banner = match session.start(seed).await {
        Ok(text) => text,
        Err(e) => format!("{}\n", e.user_message()),
    };
    stdout.write_all(banner.as_bytes()).await?;
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }
        let output = match parse_command(&line) {
            Ok(command) => match session.handle(command).await {
                Ok(Outcome::Quit) => break,
                Ok(Outcome::Print(text)) => text,
                Err(e) => {
                    tracing::debug!(error = %e, "Command failed");
                    format!("! {}\n", e.user_message())
                }
            },
            Err(e) => format!("! {}\n", rdv_app::error::AppError::from(e).user_message()),
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    tracing::info!("Session ended");
    Ok(())
}
