//! Engagement metrics and campaign thresholds

use serde::{Deserialize, Serialize};

/// Engagement counters captured for a content item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
}

impl EngagementMetrics {
    pub fn new(views: u64, likes: u64, comments: u64, shares: u64) -> Self {
        Self {
            views,
            likes,
            comments,
            shares,
        }
    }

    /// Snapshot used when the provider is unavailable
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Minimum counters a submission must reach
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default)]
    pub min_views: u64,
    #[serde(default)]
    pub min_likes: u64,
    #[serde(default)]
    pub min_comments: u64,
    #[serde(default)]
    pub min_shares: u64,
}

impl Thresholds {
    pub fn new(min_views: u64, min_likes: u64, min_comments: u64, min_shares: u64) -> Self {
        Self {
            min_views,
            min_likes,
            min_comments,
            min_shares,
        }
    }
}
