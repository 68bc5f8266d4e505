//! Eligibility Evaluator
//!
//! Pure comparison of a metrics snapshot against campaign thresholds.

use crate::types::{Campaign, EngagementMetrics, Thresholds};

/// Evaluate whether `metrics` clear every threshold
///
/// Each counter is compared with `>=`; absent counters arrive here as zero.
pub fn evaluate(metrics: &EngagementMetrics, thresholds: &Thresholds) -> bool {
    metrics.views >= thresholds.min_views
        && metrics.likes >= thresholds.min_likes
        && metrics.comments >= thresholds.min_comments
        && metrics.shares >= thresholds.min_shares
}

/// Message shown to the submitter after evaluation
pub fn verdict_message(campaign: &Campaign, eligible: bool) -> String {
    if eligible {
        format!(
            "Congratulations! Your video is eligible for {} STRK.",
            campaign.reward_amount
        )
    } else {
        format!(
            "Your video does not meet the criteria. Required: {} views, {} likes.",
            campaign.thresholds.min_views, campaign.thresholds.min_likes
        )
    }
}
