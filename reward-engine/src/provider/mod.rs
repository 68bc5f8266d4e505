//! Metrics Provider
//!
//! Engagement counters for a content item, fetched with the submitter's
//! credential. Provider payloads are parsed at this boundary into
//! [`MetricsLookup`]; nothing loosely typed leaves it.

pub mod mock;
pub mod tiktok;

pub use mock::MockMetricsProvider;
pub use tiktok::TikTokProvider;

use async_trait::async_trait;
use reward_core::EngagementMetrics;

/// Outcome of a metrics fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsLookup {
    /// Content resolved under the credential
    Found(EngagementMetrics),
    /// Content does not exist or is not owned by the credential holder
    NotFound,
    /// Provider failed; the cause is kept for logging
    Unavailable(String),
}

/// Metrics provider
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn fetch(&self, content_id: &str, credential: &str) -> MetricsLookup;
}
