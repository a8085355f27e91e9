//! Deal Screener
//!
//! Watchlist loading, bulk/block deal filtering and report assembly.
//! Everything here is synchronous and free of I/O apart from reading
//! watchlist files.

pub mod filter;
pub mod report;
pub mod watchlist;

pub use filter::{DealFilter, FilterCriteria, DEFAULT_CLIENT_KEYWORD};
pub use report::{Report, ReportBuilder, ReportSection, SectionBody, SectionOutcome};
pub use watchlist::{Watchlist, WatchlistStore};
