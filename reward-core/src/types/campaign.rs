//! Campaign Types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::metrics::Thresholds;
use crate::amount::{to_base_units, TOKEN_DECIMALS};
use crate::error::{CoreError, CoreResult};

/// Campaign identifier
pub type CampaignId = u64;

/// Default cap on winners for a new campaign
pub const DEFAULT_MAX_WINNERS: u32 = 100;

/// A reward program
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    #[serde(flatten)]
    pub thresholds: Thresholds,
    /// Per-winner reward in whole token units
    pub reward_amount: Decimal,
    /// Advisory cap, not enforced by payouts
    pub max_winners: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Build a row from an insert payload
    pub fn from_new(id: CampaignId, new: NewCampaign, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            thresholds: new.thresholds,
            reward_amount: new.reward_amount,
            max_winners: new.max_winners,
            is_active: new.is_active,
            created_at,
        }
    }

    /// Apply a partial update; absent fields keep their values
    pub fn apply_patch(&mut self, patch: CampaignPatch) -> CoreResult<()> {
        if let Some(reward) = patch.reward_amount {
            ensure_positive(&reward)?;
            self.reward_amount = reward;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(v) = patch.min_views {
            self.thresholds.min_views = v;
        }
        if let Some(v) = patch.min_likes {
            self.thresholds.min_likes = v;
        }
        if let Some(v) = patch.min_comments {
            self.thresholds.min_comments = v;
        }
        if let Some(v) = patch.min_shares {
            self.thresholds.min_shares = v;
        }
        if let Some(v) = patch.max_winners {
            self.max_winners = v;
        }
        if let Some(v) = patch.is_active {
            self.is_active = v;
        }
        Ok(())
    }
}

/// Insert payload for a campaign
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    pub thresholds: Thresholds,
    pub reward_amount: Decimal,
    pub max_winners: u32,
    pub is_active: bool,
}

impl NewCampaign {
    /// New active campaign with zero thresholds and the default winner cap
    pub fn new(name: impl Into<String>, reward_amount: Decimal) -> CoreResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoreError::missing("Name and reward amount required"));
        }
        ensure_positive(&reward_amount)?;
        Ok(Self {
            name,
            thresholds: Thresholds::default(),
            reward_amount,
            max_winners: DEFAULT_MAX_WINNERS,
            is_active: true,
        })
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_max_winners(mut self, max_winners: u32) -> Self {
        self.max_winners = max_winners;
        self
    }

    /// Campaign inserted into an empty database
    pub fn seed() -> Self {
        Self {
            name: "Campaign TikTok #1".to_string(),
            thresholds: Thresholds {
                min_views: 1000,
                min_likes: 50,
                min_comments: 0,
                min_shares: 0,
            },
            reward_amount: Decimal::from(10),
            max_winners: 50,
            is_active: true,
        }
    }
}

/// Partial campaign update
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CampaignPatch {
    pub name: Option<String>,
    pub min_views: Option<u64>,
    pub min_likes: Option<u64>,
    pub min_comments: Option<u64>,
    pub min_shares: Option<u64>,
    pub reward_amount: Option<Decimal>,
    pub max_winners: Option<u32>,
    pub is_active: Option<bool>,
}

/// A reward must convert to at least one base unit of the token
fn ensure_positive(amount: &Decimal) -> CoreResult<()> {
    to_base_units(amount, TOKEN_DECIMALS).map(|_| ())
}
