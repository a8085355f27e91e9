//! Watchlist loading.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use deal_core::{cell, DealError, COL_SYMBOL};

/// A set of upper-cased, trimmed ticker symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watchlist {
    symbols: BTreeSet<String>,
}

impl Watchlist {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = symbols
            .into_iter()
            .map(|s| normalize_symbol(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();
        Self { symbols }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(&normalize_symbol(symbol))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

pub(crate) fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

pub struct WatchlistStore;

impl WatchlistStore {
    /// Load a watchlist from a CSV file with a `Symbol` column.
    pub fn load(path: impl AsRef<Path>) -> Result<Watchlist, DealError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            DealError::SourceUnavailable(format!(
                "cannot open watchlist {}: {}",
                path.display(),
                e
            ))
        })?;

        let watchlist = Self::from_reader(file).map_err(|e| match e {
            DealError::DataFormat(msg) => {
                DealError::DataFormat(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })?;

        tracing::debug!(
            "Loaded {} symbols from watchlist {}",
            watchlist.len(),
            path.display()
        );
        Ok(watchlist)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Watchlist, DealError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let symbol_idx = reader
            .headers()
            .map_err(|e| DealError::DataFormat(format!("unreadable watchlist header: {}", e)))?
            .iter()
            .position(|h| h.trim() == COL_SYMBOL)
            .ok_or_else(|| DealError::missing_column(COL_SYMBOL))?;

        let mut symbols = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| DealError::DataFormat(format!("unreadable watchlist row: {}", e)))?;
            let row: Vec<String> = record.iter().map(str::to_string).collect();
            symbols.push(cell(&row, symbol_idx).to_string());
        }

        Ok(Watchlist::new(symbols))
    }
}
