//! Trial registry clients.

pub mod clinicaltrials;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use trialmatch_common::{TrialMatchError, TrialRecord};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Rate limited by registry (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Registry returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not decode registry payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Client(#[from] TrialMatchError),
}

/// Common interface for trial registries.
#[async_trait]
pub trait TrialRegistry: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str {
        "registry"
    }

    /// Search for trials matching a free-text query. Pagination is handled
    /// internally; `max_results` of None collects every page.
    async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<TrialRecord>, RegistryError>;

    /// Fetch the full record for one trial. Unknown identifiers are `Ok(None)`.
    async fn fetch_details(&self, nct_id: &str) -> Result<Option<TrialRecord>, RegistryError>;
}
