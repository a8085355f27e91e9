use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::DealError;

pub const COL_DATE: &str = "Date";
pub const COL_SYMBOL: &str = "Symbol";
pub const COL_CLIENT_NAME: &str = "Client Name";
pub const COL_SIDE: &str = "Buy/Sell";
pub const COL_QUANTITY: &str = "Quantity Traded";
pub const COL_PRICE: &str = "Trade Price / Wght. Avg. Price";

/// Every column a deal feed must carry.
pub const REQUIRED_DEAL_COLUMNS: [&str; 6] = [
    COL_DATE,
    COL_SYMBOL,
    COL_CLIENT_NAME,
    COL_SIDE,
    COL_QUANTITY,
    COL_PRICE,
];

/// Exchange disclosure list a deal was reported on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DealType {
    Bulk,
    Block,
}

impl DealType {
    /// Report order: bulk first, then block.
    pub const ALL: [DealType; 2] = [DealType::Bulk, DealType::Block];

    pub fn label(&self) -> &'static str {
        match self {
            DealType::Bulk => "Bulk",
            DealType::Block => "Block",
        }
    }
}

impl fmt::Display for DealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = DealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" | "B" => Ok(Side::Buy),
            "SELL" | "S" => Ok(Side::Sell),
            other => Err(DealError::DataFormat(format!(
                "unrecognised {} value '{}'",
                COL_SIDE, other
            ))),
        }
    }
}

/// One disclosed trade that survived filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct DealRecord {
    pub trade_date: NaiveDate,
    pub symbol: String,
    pub client_name: String,
    pub side: Side,
    pub quantity: u64,
    pub price: Decimal,
}

/// Untyped tabular feed as delivered by a `DealSource`.
///
/// Header names are kept verbatim; callers trim them when looking columns up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Parse CSV text with a header row. Ragged rows are accepted.
    pub fn from_csv(text: &str) -> Result<Self, DealError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| DealError::DataFormat(format!("unreadable CSV header: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record
                .map_err(|e| DealError::DataFormat(format!("unreadable CSV row {}: {}", idx + 1, e)))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Index of the column whose trimmed header equals `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, DealError> {
        self.column(name).ok_or_else(|| DealError::missing_column(name))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Cell lookup that treats a short row as having empty trailing cells.
pub fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// A finished, self-contained report ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub html: String,
}
