//! Engine Configuration
//!
//! Ledger and metrics provider settings, loaded from environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{LedgerError, LedgerResult};

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_lookback_blocks() -> u64 {
    10_000
}

fn default_request_timeout() -> u64 {
    30
}

/// Starknet settlement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Treasury account paying rewards
    pub treasury_address: String,
    /// ERC20 reward token contract
    pub token_address: String,
    /// Signing relayer that holds the treasury key
    pub signer_url: String,
    /// Finality poll interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on a finality wait; `None` waits indefinitely
    pub finality_timeout_secs: Option<u64>,
    /// Block window scanned by reconciliation
    #[serde(default = "default_lookback_blocks")]
    pub reconcile_lookback_blocks: u64,
    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            treasury_address: String::new(),
            token_address: String::new(),
            signer_url: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            finality_timeout_secs: None,
            reconcile_lookback_blocks: default_lookback_blocks(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables
    ///
    /// Missing endpoints are left empty and reported by [`validate`](Self::validate)
    /// when the ledger is first used, so the service can start without them.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rpc_url: env::var("STARKNET_RPC_URL").unwrap_or_default(),
            treasury_address: env::var("STARKNET_ADMIN_ADDRESS").unwrap_or_default(),
            token_address: env::var("STRK_TOKEN_ADDRESS").unwrap_or_default(),
            signer_url: env::var("STARKNET_SIGNER_URL").unwrap_or_default(),
            poll_interval_ms: env::var("STARKNET_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.poll_interval_ms),
            finality_timeout_secs: env::var("STARKNET_FINALITY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
            reconcile_lookback_blocks: env::var("STARKNET_RECONCILE_LOOKBACK_BLOCKS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.reconcile_lookback_blocks),
            request_timeout_secs: defaults.request_timeout_secs,
        }
    }

    /// Sepolia testnet with the public STRK token
    pub fn testnet(rpc_url: &str, treasury_address: &str, signer_url: &str) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            treasury_address: treasury_address.to_string(),
            token_address: STRK_TOKEN_ADDRESS.to_string(),
            signer_url: signer_url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_finality_timeout(mut self, secs: u64) -> Self {
        self.finality_timeout_secs = Some(secs);
        self
    }

    /// Check that every endpoint needed for settlement is set
    pub fn validate(&self) -> LedgerResult<()> {
        let missing: Vec<&str> = [
            ("STARKNET_RPC_URL", &self.rpc_url),
            ("STARKNET_ADMIN_ADDRESS", &self.treasury_address),
            ("STRK_TOKEN_ADDRESS", &self.token_address),
            ("STARKNET_SIGNER_URL", &self.signer_url),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::Configuration(format!(
                "Missing required Starknet environment variables: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn finality_timeout(&self) -> Option<Duration> {
        self.finality_timeout_secs.map(Duration::from_secs)
    }
}

/// STRK token contract (same address on mainnet and Sepolia)
pub const STRK_TOKEN_ADDRESS: &str =
    "0x04718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d";

/// Metrics provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// TikTok open API base URL
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://open.tiktokapis.com".to_string(),
            timeout_secs: 15,
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: env::var("TIKTOK_API_BASE").unwrap_or(defaults.api_base),
            timeout_secs: defaults.timeout_secs,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_missing() {
        let config = LedgerConfig {
            rpc_url: "http://localhost:5050".into(),
            ..LedgerConfig::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("STARKNET_ADMIN_ADDRESS"));
        assert!(err.contains("STARKNET_SIGNER_URL"));
        assert!(!err.contains("STARKNET_RPC_URL"));
    }

    #[test]
    fn test_testnet_preset() {
        let config = LedgerConfig::testnet("http://rpc", "0x1", "http://signer");
        assert!(config.validate().is_ok());
        assert_eq!(config.token_address, STRK_TOKEN_ADDRESS);
        assert!(config.finality_timeout().is_none());
        assert_eq!(
            config.with_finality_timeout(90).finality_timeout(),
            Some(Duration::from_secs(90))
        );
    }
}
