//! Single pass: load watchlists, fetch and filter each feed, assemble the
//! report, deliver it.
//!
//! Every (category × deal type) unit is isolated. Its failure becomes an
//! inline notice in the report; only delivery can fail the run.

use chrono::{DateTime, NaiveDate, Utc};
use deal_core::{human_date_string, reference_date, DealSource, DealType, Document};
use deal_screener::{
    DealFilter, FilterCriteria, Report, ReportBuilder, SectionOutcome, Watchlist, WatchlistStore,
};
use notification_service::{NotificationError, Notifier};

use crate::config::TrackerConfig;

pub fn email_subject(date: NaiveDate) -> String {
    format!("Mutual Fund Deal Tracker Report - {}", human_date_string(date))
}

async fn run_unit(
    source: &dyn DealSource,
    endpoint: &str,
    criteria: &FilterCriteria<'_>,
) -> SectionOutcome {
    let table = source.fetch(endpoint).await?;
    DealFilter::filter(&table, criteria)
}

pub async fn build_report(
    config: &TrackerConfig,
    source: &dyn DealSource,
    date: NaiveDate,
) -> Report {
    let mut builder = ReportBuilder::new(date);

    for category in &config.categories {
        let watchlist: Result<Watchlist, _> = WatchlistStore::load(&category.path);
        if let Ok(wl) = &watchlist {
            tracing::info!("{} watchlist: {} symbols", category.label, wl.len());
        }

        for deal_type in DealType::ALL {
            let outcome = match &watchlist {
                Ok(wl) => {
                    let criteria = FilterCriteria::new(date, wl)
                        .with_client_keyword(&config.client_keyword);
                    run_unit(source, config.endpoint(deal_type), &criteria).await
                }
                Err(e) => Err(e.clone()),
            };

            match &outcome {
                Ok(records) => tracing::info!(
                    "{} deals for {}: {} matches",
                    deal_type,
                    category.label,
                    records.len()
                ),
                Err(e) => tracing::warn!("{} deals for {} failed: {}", deal_type, category.label, e),
            }

            builder.record(deal_type, &category.label, outcome);
        }
    }

    builder.build(&config.category_labels())
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub subject: String,
    pub report: Report,
    pub document: Document,
}

pub async fn run(
    config: &TrackerConfig,
    source: &dyn DealSource,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> Result<RunSummary, NotificationError> {
    let date = reference_date(now, config.timezone);
    tracing::info!(
        "Tracking {} deals for {} via {}",
        config.client_keyword,
        human_date_string(date),
        source.name()
    );

    let report = build_report(config, source, date).await;
    let document = report.render();
    let subject = email_subject(date);

    tracing::info!(
        "Report ready: {} sections, {} matches, {} failed sections",
        report.sections.len(),
        report.match_count(),
        report.error_count()
    );

    notifier.deliver(&subject, &document).await?;

    Ok(RunSummary {
        subject,
        report,
        document,
    })
}
