//! Account-keyed locks
//!
//! One async mutex per treasury account. Disbursement and reconciliation
//! hold it for their whole run, so no two batches from the same account
//! overlap and no two transfers from it are ever in flight together.

use reward_core::normalize_address;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// Registry of per-account mutexes
#[derive(Debug, Default, Clone)]
pub struct AccountLocks {
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, account: &str) -> Arc<tokio::sync::Mutex<()>> {
        let key = normalize_address(account);
        // The registry lock is only held to look up the slot, never across an await
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(key).or_default().clone()
    }

    /// Wait for exclusive access to `account`
    pub async fn acquire(&self, account: &str) -> OwnedMutexGuard<()> {
        let slot = self.slot(account);
        if slot.try_lock().is_err() {
            debug!(%account, "Waiting for account lock");
        }
        slot.lock_owned().await
    }

    /// Whether `account` is currently held
    pub fn is_locked(&self, account: &str) -> bool {
        self.slot(account).try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_account_is_exclusive() {
        let locks = AccountLocks::new();
        let guard = locks.acquire("0x0ABC").await;
        assert!(locks.is_locked("0xabc"));

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _guard = contender.acquire("0xabc").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert!(!locks.is_locked("0xabc"));
    }

    #[tokio::test]
    async fn test_accounts_are_independent() {
        let locks = AccountLocks::new();
        let _a = locks.acquire("0xa").await;
        let _b = locks.acquire("0xb").await;
        assert!(locks.is_locked("0xa"));
        assert!(locks.is_locked("0xb"));
    }
}
