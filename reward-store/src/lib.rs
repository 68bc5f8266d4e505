//! Reward Store - Persistence for the reward engine
//!
//! Two backends implement the same repository traits:
//! - [`SledStore`] - embedded, durable, one sled tree per table
//! - [`MemoryStore`] - in-process, used by tests and throwaway runs
//!
//! # Usage Example
//!
//! ```ignore
//! use reward_store::{RewardDatabase, StorageConfig};
//!
//! async fn example() {
//!     let db = RewardDatabase::open(&StorageConfig::from_env()).unwrap();
//!     db.init_schema().await.unwrap();
//!     let store = db.store();
//!     let campaign = store.active_campaign().await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod repos;
pub mod sled_store;

pub use config::{StorageBackend, StorageConfig};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use repos::{
    CampaignRepository, PayoutAttemptRepository, RewardStore, SessionRepository,
    SubmissionRepository,
};
pub use sled_store::SledStore;

use reward_core::NewCampaign;
use std::sync::Arc;

/// Database facade
///
/// Owns whichever backend the configuration selected and hands it out as a
/// shared trait object.
#[derive(Clone)]
pub struct RewardDatabase {
    store: Arc<dyn RewardStore>,
    sled: Option<SledStore>,
}

impl RewardDatabase {
    /// Open the backend named by the configuration
    pub fn open(config: &StorageConfig) -> StoreResult<Self> {
        match config.backend {
            StorageBackend::Memory => Ok(Self::memory()),
            StorageBackend::Sled => {
                let sled = SledStore::new(config)?;
                tracing::info!(data_dir = %config.data_dir, "Opened sled store");
                Ok(Self {
                    store: Arc::new(sled.clone()),
                    sled: Some(sled),
                })
            }
        }
    }

    /// Fresh in-memory database
    pub fn memory() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            sled: None,
        }
    }

    /// Seed the default campaign when none exists
    ///
    /// Returns whether a campaign was created.
    pub async fn init_schema(&self) -> StoreResult<bool> {
        if self.store.count_campaigns().await? > 0 {
            return Ok(false);
        }

        let campaign = self.store.create_campaign(NewCampaign::seed()).await?;
        tracing::info!(campaign_id = campaign.id, name = %campaign.name, "Seeded default campaign");
        Ok(true)
    }

    /// Check database health
    pub async fn health_check(&self) -> StoreResult<bool> {
        self.store.count_campaigns().await.map(|_| true)
    }

    /// Flush pending writes (no-op for the memory backend)
    pub async fn flush(&self) -> StoreResult<()> {
        match &self.sled {
            Some(sled) => sled.flush().await,
            None => Ok(()),
        }
    }

    /// Shared handle to every repository
    pub fn store(&self) -> Arc<dyn RewardStore> {
        self.store.clone()
    }

    pub fn backend_name(&self) -> &'static str {
        if self.sled.is_some() {
            "sled"
        } else {
            "memory"
        }
    }
}
