use anyhow::{Context, Result};
use notification_service::{NotificationConfig, SmtpNotifier};
use nse_client::NseArchiveClient;

mod config;
mod pipeline;

use config::TrackerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env, init tracing
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    tracing::info!("Starting mutual fund deal tracker");

    // 2. Delivery settings are mandatory; fail before touching the network
    let notification_config =
        NotificationConfig::from_env().context("email delivery is not configured")?;
    let notifier = SmtpNotifier::new(&notification_config)?;
    tracing::info!(
        "  SMTP: {}:{} -> {} recipients",
        notification_config.smtp_host,
        notification_config.smtp_port,
        notifier.recipients().len()
    );

    // 3. Tracker settings
    let config = TrackerConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Watchlists: {}", config.category_labels().join(", "));
    tracing::info!("  Bulk feed: {}", config.bulk_url);
    tracing::info!("  Block feed: {}", config.block_url);
    tracing::info!("  Time zone: {}", config.timezone.name());

    // 4. Run
    let source = NseArchiveClient::new(config.client.clone())?;
    let summary = pipeline::run(&config, &source, &notifier, chrono::Utc::now())
        .await
        .context("report delivery failed")?;

    tracing::info!(
        "Sent \"{}\" ({} bytes, {} matches, {} failed sections)",
        summary.subject,
        summary.document.html.len(),
        summary.report.match_count(),
        summary.report.error_count()
    );
    Ok(())
}
