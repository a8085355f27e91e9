//! Deal filtering.
//!
//! A row is kept when its trade date equals the reference date (exact string
//! comparison against the feed format), its symbol is on the watchlist, and
//! its client name contains the keyword case-insensitively. Source order is
//! preserved.

use std::str::FromStr;

use chrono::NaiveDate;
use deal_core::{
    cell, feed_date_string, DealError, DealRecord, RawTable, Side, COL_CLIENT_NAME, COL_DATE,
    COL_PRICE, COL_QUANTITY, COL_SIDE, COL_SYMBOL,
};
use rust_decimal::Decimal;

use crate::watchlist::{normalize_symbol, Watchlist};

pub const DEFAULT_CLIENT_KEYWORD: &str = "mutual fund";

#[derive(Debug, Clone)]
pub struct FilterCriteria<'a> {
    pub reference_date: NaiveDate,
    pub watchlist: &'a Watchlist,
    pub client_keyword: &'a str,
}

impl<'a> FilterCriteria<'a> {
    pub fn new(reference_date: NaiveDate, watchlist: &'a Watchlist) -> Self {
        Self {
            reference_date,
            watchlist,
            client_keyword: DEFAULT_CLIENT_KEYWORD,
        }
    }

    pub fn with_client_keyword(mut self, keyword: &'a str) -> Self {
        self.client_keyword = keyword;
        self
    }
}

struct Columns {
    date: usize,
    symbol: usize,
    client: usize,
    side: usize,
    quantity: usize,
    price: usize,
}

impl Columns {
    fn resolve(table: &RawTable) -> Result<Self, DealError> {
        Ok(Self {
            date: table.require_column(COL_DATE)?,
            symbol: table.require_column(COL_SYMBOL)?,
            client: table.require_column(COL_CLIENT_NAME)?,
            side: table.require_column(COL_SIDE)?,
            quantity: table.require_column(COL_QUANTITY)?,
            price: table.require_column(COL_PRICE)?,
        })
    }
}

pub struct DealFilter;

impl DealFilter {
    pub fn filter(
        table: &RawTable,
        criteria: &FilterCriteria<'_>,
    ) -> Result<Vec<DealRecord>, DealError> {
        let cols = Columns::resolve(table)?;
        let today = feed_date_string(criteria.reference_date);
        let keyword = criteria.client_keyword.to_lowercase();

        let mut matches = Vec::new();
        for (idx, row) in table.rows.iter().enumerate() {
            if cell(row, cols.date).trim().to_uppercase() != today {
                continue;
            }

            let symbol = normalize_symbol(cell(row, cols.symbol));
            if !criteria.watchlist.contains(&symbol) {
                continue;
            }

            let client_name = cell(row, cols.client).trim();
            if !client_name.to_lowercase().contains(&keyword) {
                continue;
            }

            // Row numbers in messages are 1-based and exclude the header.
            let line = idx + 1;
            matches.push(DealRecord {
                trade_date: criteria.reference_date,
                symbol,
                client_name: client_name.to_string(),
                side: Side::from_str(cell(row, cols.side))
                    .map_err(|e| at_row(e, line))?,
                quantity: parse_quantity(cell(row, cols.quantity)).map_err(|e| at_row(e, line))?,
                price: parse_price(cell(row, cols.price)).map_err(|e| at_row(e, line))?,
            });
        }

        tracing::debug!(
            "{} of {} rows matched for {}",
            matches.len(),
            table.len(),
            today
        );
        Ok(matches)
    }
}

fn at_row(err: DealError, line: usize) -> DealError {
    match err {
        DealError::DataFormat(msg) => DealError::DataFormat(format!("row {}: {}", line, msg)),
        other => other,
    }
}

fn strip_number(raw: &str) -> String {
    raw.trim().replace(',', "")
}

fn parse_quantity(raw: &str) -> Result<u64, DealError> {
    strip_number(raw).parse::<u64>().map_err(|_| {
        DealError::DataFormat(format!("invalid {} '{}'", COL_QUANTITY, raw.trim()))
    })
}

fn parse_price(raw: &str) -> Result<Decimal, DealError> {
    let invalid = || DealError::DataFormat(format!("invalid trade price '{}'", raw.trim()));
    let price = Decimal::from_str(&strip_number(raw)).map_err(|_| invalid())?;
    if price.is_sign_negative() {
        return Err(invalid());
    }
    Ok(price)
}
