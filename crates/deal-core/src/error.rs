use thiserror::Error;

/// Failures local to one (category × deal type) report section.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DealError {
    #[error("Data format error: {0}")]
    DataFormat(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),
}

impl DealError {
    pub fn missing_column(column: &str) -> Self {
        DealError::DataFormat(format!("missing required column '{}'", column))
    }
}
