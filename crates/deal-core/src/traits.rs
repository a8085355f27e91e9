use async_trait::async_trait;
use crate::{DealError, RawTable};

/// Retrieval of a raw deal feed. Implementations own transport concerns only.
#[async_trait]
pub trait DealSource: Send + Sync {
    async fn fetch(&self, endpoint: &str) -> Result<RawTable, DealError>;

    fn name(&self) -> &str;
}
