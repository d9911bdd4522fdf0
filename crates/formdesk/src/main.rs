//! `formdesk` - terminal admin console for contact form submissions.
//!
//! Signs an admin in against the identity provider, then pages through the
//! submissions store with sorting, a local search, read toggling, confirmed
//! deletes and CSV export.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod command;
mod config;
mod console;
mod view;

use anyhow::{Context, bail};
use formdesk_auth::{AccessGuard, IdentityToolkit};
use formdesk_core::{SqliteStore, SubmissionBrowser};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{API_KEY_ENV, AppConfig};
use console::Console;

const DEFAULT_LOG_FILTER: &str = "formdesk=info,formdesk_core=info,formdesk_auth=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().await?;

    // Initialize logging; stderr keeps the table on stdout readable
    let fallback = config
        .log_filter
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting formdesk");

    if config.identity.api_key.is_empty() {
        let path = AppConfig::default_path();
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            config.save_to(&path).await?;
        }
        bail!(
            "no identity API key configured: set {API_KEY_ENV} or identity.api_key in {}",
            AppConfig::default_path().display()
        );
    }

    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let database = config.database_path.to_string_lossy();
    let store = SqliteStore::new(&database)
        .await
        .with_context(|| format!("opening {database}"))?;
    info!("Opened submissions database at {database}");

    let toolkit = IdentityToolkit::new(config.identity.api_key.clone(), config.endpoints()?)?
        .with_timeout(config.auth_timeout())?;
    let browser = SubmissionBrowser::new(store, config.browser_config());

    Console::new(
        AccessGuard::new(toolkit),
        browser,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .with_export_path(config.export_path.clone())
    .run()
    .await?;

    info!("Goodbye");
    Ok(())
}
