//! TikTok video query client

use async_trait::async_trait;
use reqwest::Client;
use reward_core::EngagementMetrics;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{MetricsLookup, MetricsProvider};
use crate::config::ProviderConfig;

const VIDEO_QUERY_PATH: &str = "/v2/video/query/";
const VIDEO_FIELDS: &str = "id,view_count,like_count,comment_count,share_count";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Option<QueryData>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryData {
    #[serde(default)]
    videos: Vec<Video>,
}

/// Counters may be absent; absent counts as zero
#[derive(Debug, Deserialize)]
struct Video {
    #[serde(default)]
    view_count: Option<u64>,
    #[serde(default)]
    like_count: Option<u64>,
    #[serde(default)]
    comment_count: Option<u64>,
    #[serde(default)]
    share_count: Option<u64>,
}

impl From<Video> for EngagementMetrics {
    fn from(v: Video) -> Self {
        EngagementMetrics::new(
            v.view_count.unwrap_or(0),
            v.like_count.unwrap_or(0),
            v.comment_count.unwrap_or(0),
            v.share_count.unwrap_or(0),
        )
    }
}

/// TikTok open API metrics provider
pub struct TikTokProvider {
    client: Client,
    config: ProviderConfig,
}

impl TikTokProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn query_url(&self) -> String {
        format!(
            "{}{}?fields={}",
            self.config.api_base.trim_end_matches('/'),
            VIDEO_QUERY_PATH,
            VIDEO_FIELDS
        )
    }

    async fn query(&self, content_id: &str, credential: &str) -> Result<QueryResponse, String> {
        let response = self
            .client
            .post(self.query_url())
            .bearer_auth(credential)
            .json(&serde_json::json!({
                "filters": { "video_ids": [content_id] }
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {} - {}", status, body));
        }

        response.json().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl MetricsProvider for TikTokProvider {
    async fn fetch(&self, content_id: &str, credential: &str) -> MetricsLookup {
        match self.query(content_id, credential).await {
            Ok(response) => {
                let video = response
                    .data
                    .unwrap_or_default()
                    .videos
                    .into_iter()
                    .next();
                match video {
                    Some(video) => {
                        let metrics = EngagementMetrics::from(video);
                        debug!(%content_id, ?metrics, "Fetched video metrics");
                        MetricsLookup::Found(metrics)
                    }
                    None => MetricsLookup::NotFound,
                }
            }
            Err(cause) => {
                warn!(%content_id, error = %cause, "TikTok video query failed");
                MetricsLookup::Unavailable(cause)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_url() {
        let provider =
            TikTokProvider::new(ProviderConfig::default().with_api_base("http://localhost:9000/"))
                .unwrap();
        assert_eq!(
            provider.query_url(),
            "http://localhost:9000/v2/video/query/?fields=id,view_count,like_count,comment_count,share_count"
        );
    }

    #[test]
    fn test_missing_counters_are_zero() {
        let body = r#"{"data":{"videos":[{"id":"1","view_count":1200}]}}"#;
        let parsed: QueryResponse = serde_json::from_str(body).unwrap();
        let video = parsed.data.unwrap().videos.into_iter().next().unwrap();
        assert_eq!(EngagementMetrics::from(video), EngagementMetrics::new(1200, 0, 0, 0));
    }

    #[test]
    fn test_empty_payload_has_no_videos() {
        let parsed: QueryResponse = serde_json::from_str(r#"{"error":{"code":"ok"}}"#).unwrap();
        assert!(parsed.data.unwrap_or_default().videos.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_unavailable() {
        let provider =
            TikTokProvider::new(ProviderConfig::default().with_api_base("http://127.0.0.1:1"))
                .unwrap();
        assert!(matches!(
            provider.fetch("42", "token").await,
            MetricsLookup::Unavailable(_)
        ));
    }
}
