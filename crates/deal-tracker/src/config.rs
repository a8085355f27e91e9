use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use deal_core::{DealType, DEFAULT_TIMEZONE};
use deal_screener::DEFAULT_CLIENT_KEYWORD;
use nse_client::{ClientSettings, BLOCK_DEALS_URL, BULK_DEALS_URL};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_WATCHLIST_FILES: &str =
    "Large Cap=largecap_watchlist.csv,Small Cap=smallcap_watchlist.csv";

/// A named watchlist and the file it is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchlistCategory {
    pub label: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    // Report order follows this list
    pub categories: Vec<WatchlistCategory>,

    // Feeds
    pub bulk_url: String,
    pub block_url: String,

    // Matching
    pub timezone: Tz,
    pub client_keyword: String,

    // Request shaping for the exchange archive
    pub client: ClientSettings,
}

impl TrackerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string());
        let defaults = ClientSettings::default();

        let timezone_name = var("REPORT_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.name().to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown REPORT_TIMEZONE '{}'", timezone_name))?;

        let warmup_delay_ms: u64 = var("NSE_WARMUP_DELAY_MS")
            .unwrap_or_else(|| defaults.warmup_delay.as_millis().to_string())
            .parse()
            .context("invalid NSE_WARMUP_DELAY_MS")?;
        let timeout_secs: u64 = var("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|| defaults.timeout.as_secs().to_string())
            .parse()
            .context("invalid HTTP_TIMEOUT_SECS")?;
        if timeout_secs == 0 {
            bail!("HTTP_TIMEOUT_SECS must be at least 1");
        }

        let client_keyword = var("CLIENT_NAME_KEYWORD")
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| DEFAULT_CLIENT_KEYWORD.to_string());

        let config = Self {
            categories: parse_watchlist_files(
                &var("WATCHLIST_FILES").unwrap_or_else(|| DEFAULT_WATCHLIST_FILES.to_string()),
            )?,
            bulk_url: var("BULK_DEALS_URL").unwrap_or_else(|| BULK_DEALS_URL.to_string()),
            block_url: var("BLOCK_DEALS_URL").unwrap_or_else(|| BLOCK_DEALS_URL.to_string()),
            timezone,
            client_keyword,
            client: ClientSettings {
                user_agent: var("NSE_USER_AGENT").unwrap_or(defaults.user_agent),
                referer: var("NSE_REFERER").unwrap_or(defaults.referer),
                cookie: var("NSE_COOKIE").filter(|c| !c.is_empty()),
                // An explicitly empty value disables the warm-up request.
                homepage_url: match var("NSE_HOMEPAGE_URL") {
                    Some(url) if url.is_empty() => None,
                    Some(url) => Some(url),
                    None => defaults.homepage_url,
                },
                warmup_delay: Duration::from_millis(warmup_delay_ms),
                timeout: Duration::from_secs(timeout_secs),
            },
        };

        Ok(config)
    }

    pub fn endpoint(&self, deal_type: DealType) -> &str {
        match deal_type {
            DealType::Bulk => &self.bulk_url,
            DealType::Block => &self.block_url,
        }
    }

    pub fn category_labels(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.label.as_str()).collect()
    }
}

/// Parse `Label=path,Label=path`.
fn parse_watchlist_files(raw: &str) -> Result<Vec<WatchlistCategory>> {
    let mut categories: Vec<WatchlistCategory> = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((label, path)) = entry.split_once('=') else {
            bail!("WATCHLIST_FILES entry '{}' is not of the form Label=path", entry);
        };
        let (label, path) = (label.trim(), path.trim());
        if label.is_empty() || path.is_empty() {
            bail!("WATCHLIST_FILES entry '{}' has an empty label or path", entry);
        }
        if categories.iter().any(|c| c.label == label) {
            bail!("WATCHLIST_FILES lists '{}' more than once", label);
        }
        categories.push(WatchlistCategory {
            label: label.to_string(),
            path: PathBuf::from(path),
        });
    }

    if categories.is_empty() {
        bail!("WATCHLIST_FILES does not name any watchlist");
    }
    Ok(categories)
}
