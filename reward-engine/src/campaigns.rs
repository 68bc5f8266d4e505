//! Campaign management

use reward_core::{Campaign, CampaignId, CampaignPatch, CoreError, NewCampaign, Thresholds};
use reward_store::{CampaignRepository, RewardStore};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::{EngineError, EngineResult};

/// Campaign creation input; absent thresholds default to zero
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub min_views: Option<u64>,
    #[serde(default)]
    pub min_likes: Option<u64>,
    #[serde(default)]
    pub min_comments: Option<u64>,
    #[serde(default)]
    pub min_shares: Option<u64>,
    #[serde(default)]
    pub reward_amount: Option<Decimal>,
    #[serde(default)]
    pub max_winners: Option<u32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl CampaignDraft {
    pub fn into_new(self) -> Result<NewCampaign, CoreError> {
        let (name, reward) = match (self.name, self.reward_amount) {
            (Some(name), Some(reward)) if !name.trim().is_empty() => (name, reward),
            _ => return Err(CoreError::missing("Name and reward amount required")),
        };

        let mut campaign = NewCampaign::new(name, reward)?.with_thresholds(Thresholds::new(
            self.min_views.unwrap_or(0),
            self.min_likes.unwrap_or(0),
            self.min_comments.unwrap_or(0),
            self.min_shares.unwrap_or(0),
        ));
        if let Some(max_winners) = self.max_winners {
            campaign = campaign.with_max_winners(max_winners);
        }
        if let Some(is_active) = self.is_active {
            campaign.is_active = is_active;
        }
        Ok(campaign)
    }
}

/// Campaign workflows
pub struct CampaignService {
    store: Arc<dyn RewardStore>,
}

impl CampaignService {
    pub fn new(store: Arc<dyn RewardStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> EngineResult<Vec<Campaign>> {
        Ok(self.store.list_campaigns().await?)
    }

    /// The most recently created active campaign
    pub async fn active(&self) -> EngineResult<Campaign> {
        self.store
            .active_campaign()
            .await?
            .ok_or_else(|| EngineError::not_found("Campaign", "active"))
    }

    pub async fn create(&self, draft: CampaignDraft) -> EngineResult<Campaign> {
        let campaign = self.store.create_campaign(draft.into_new()?).await?;
        info!(id = campaign.id, name = %campaign.name, reward = %campaign.reward_amount, "Campaign created");
        Ok(campaign)
    }

    /// Change only the supplied fields
    pub async fn update(&self, id: CampaignId, patch: CampaignPatch) -> EngineResult<Campaign> {
        let campaign = self.store.update_campaign(id, patch).await?;
        info!(id, "Campaign updated");
        Ok(campaign)
    }

    /// Delete a campaign and every submission under it
    pub async fn delete(&self, id: CampaignId) -> EngineResult<u64> {
        let removed = self.store.delete_campaign(id).await?;
        info!(id, removed_submissions = removed, "Campaign deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reward_store::MemoryStore;

    fn draft(name: &str, reward: Option<i64>) -> CampaignDraft {
        CampaignDraft {
            name: Some(name.to_string()),
            reward_amount: reward.map(Decimal::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_draft_defaults() {
        let new = draft("Spring", Some(5)).into_new().unwrap();
        assert_eq!(new.thresholds, Thresholds::default());
        assert_eq!(new.max_winners, 100);
        assert!(new.is_active);
    }

    #[test]
    fn test_draft_requires_name_and_reward() {
        let err = draft("", Some(5)).into_new().unwrap_err();
        assert_eq!(err.user_message(), "Name and reward amount required");
        assert!(draft("Spring", None).into_new().is_err());
        assert!(draft("Spring", Some(0)).into_new().is_err());
    }

    #[test]
    fn test_draft_accepts_string_or_number_reward() {
        let from_str: CampaignDraft =
            serde_json::from_str(r#"{"name":"a","reward_amount":"2.5","min_views":10}"#).unwrap();
        let from_num: CampaignDraft =
            serde_json::from_str(r#"{"name":"a","reward_amount":2.5}"#).unwrap();
        assert_eq!(from_str.reward_amount, from_num.reward_amount);
        assert_eq!(from_str.into_new().unwrap().thresholds.min_views, 10);
    }

    #[tokio::test]
    async fn test_crud() {
        let service = CampaignService::new(Arc::new(MemoryStore::new()));
        assert!(service.active().await.is_err());

        let first = service.create(draft("One", Some(1))).await.unwrap();
        let second = service.create(draft("Two", Some(2))).await.unwrap();
        assert_eq!(service.active().await.unwrap().id, second.id);

        let updated = service
            .update(
                first.id,
                CampaignPatch {
                    min_likes: Some(7),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.thresholds.min_likes, 7);
        assert_eq!(updated.name, "One");

        let listed = service.list().await.unwrap();
        assert_eq!(listed.iter().map(|c| c.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        service.delete(second.id).await.unwrap();
        assert_eq!(service.active().await.unwrap().id, first.id);
        assert!(matches!(
            service.delete(second.id).await.unwrap_err(),
            EngineError::NotFound { .. }
        ));
    }
}
