//! Mock metrics provider

use async_trait::async_trait;
use reward_core::EngagementMetrics;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{MetricsLookup, MetricsProvider};

/// Metrics provider backed by a map of content id to metrics
///
/// Unknown content ids resolve to `NotFound`. While unavailable, every
/// fetch returns `Unavailable`.
#[derive(Debug, Default)]
pub struct MockMetricsProvider {
    videos: RwLock<HashMap<String, EngagementMetrics>>,
    unavailable: RwLock<Option<String>>,
}

impl MockMetricsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, content_id: &str, metrics: EngagementMetrics) -> Self {
        self.videos
            .get_mut()
            .insert(content_id.to_string(), metrics);
        self
    }

    pub async fn set_video(&self, content_id: &str, metrics: EngagementMetrics) {
        self.videos
            .write()
            .await
            .insert(content_id.to_string(), metrics);
    }

    /// Fail every fetch with `cause`, or recover with `None`
    pub async fn set_unavailable(&self, cause: Option<&str>) {
        *self.unavailable.write().await = cause.map(str::to_string);
    }
}

#[async_trait]
impl MetricsProvider for MockMetricsProvider {
    async fn fetch(&self, content_id: &str, _credential: &str) -> MetricsLookup {
        if let Some(cause) = self.unavailable.read().await.clone() {
            return MetricsLookup::Unavailable(cause);
        }
        match self.videos.read().await.get(content_id) {
            Some(metrics) => MetricsLookup::Found(*metrics),
            None => MetricsLookup::NotFound,
        }
    }
}
