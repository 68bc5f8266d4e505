//! Starknet JSON-RPC ledger
//!
//! Reads go straight to a Starknet node. Transfers are signed and sent by an
//! external relayer that holds the treasury key; this client only tells it
//! what to send and with which nonce.

use async_trait::async_trait;
use reqwest::Client;
use reward_core::amount::parse_felt_u128;
use reward_core::{normalize_address, Uint256};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{poll_finality, Finality, SettlementLedger, TransferRecord, TreasuryAccount, TxStatus};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};

/// `balanceOf` entry point selector
pub const BALANCE_OF_SELECTOR: &str =
    "0x2e4263afad30923c891518314c3c95dbe830a16874e8abc5777a9a20b54c76e";

/// `Transfer` event key
pub const TRANSFER_EVENT_SELECTOR: &str =
    "0x99cd8bde557814842a3121e8ddfd433a539b8c9f14bf31ebf108d12e6196e9";

/// Node error code for an unknown transaction hash
const TXN_HASH_NOT_FOUND: i64 = 29;

/// Events requested per `starknet_getEvents` page
const EVENTS_CHUNK_SIZE: u64 = 1000;

/// JSON-RPC request
#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Signer relayer request
#[derive(Debug, Serialize)]
struct TransferRequest<'a> {
    sender: &'a str,
    token: &'a str,
    recipient: &'a str,
    amount: AmountFelts,
    nonce: String,
}

#[derive(Debug, Serialize)]
struct AmountFelts {
    low: String,
    high: String,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    transaction_hash: String,
}

#[derive(Debug, Deserialize)]
struct TransactionStatusResult {
    finality_status: String,
    execution_status: Option<String>,
    failure_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmittedEvent {
    transaction_hash: String,
    block_number: Option<u64>,
    keys: Vec<String>,
    data: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EventsPage {
    events: Vec<EmittedEvent>,
    continuation_token: Option<String>,
}

/// Starknet settlement ledger
pub struct StarknetLedger {
    client: Client,
    config: LedgerConfig,
    request_id: AtomicU64,
}

impl StarknetLedger {
    pub fn new(config: LedgerConfig) -> LedgerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LedgerError::RpcConnection(e.to_string()))?;

        Ok(Self {
            client,
            config,
            request_id: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Make an RPC call
    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> LedgerResult<T> {
        self.config.validate()?;
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        debug!("Starknet RPC call: {} id={}", method, id);

        let response = self
            .client
            .post(&self.config.rpc_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::RpcRequest(format!("HTTP {} - {}", status, body)));
        }

        let rpc_response: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| LedgerError::RpcRequest(e.to_string()))?;

        if let Some(error) = rpc_response.error {
            return Err(LedgerError::RpcResponse {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| LedgerError::InvalidResponse("Empty response".to_string()))
    }

    async fn block_number(&self) -> LedgerResult<u64> {
        self.call("starknet_blockNumber", serde_json::json!([])).await
    }

    /// Map a `starknet_getTransactionStatus` reply to a [`TxStatus`]
    ///
    /// Only an accepted block with a successful execution is final.
    fn classify(status: TransactionStatusResult) -> TxStatus {
        let failed = |default: &str| TxStatus::Failed {
            reason: status
                .failure_reason
                .clone()
                .unwrap_or_else(|| default.to_string()),
        };

        match status.finality_status.as_str() {
            "REJECTED" => failed("Transaction rejected"),
            "REVERTED" => failed("Transaction reverted"),
            "ACCEPTED_ON_L2" | "ACCEPTED_ON_L1" => match status.execution_status.as_deref() {
                Some("REVERTED") => failed("Transaction reverted"),
                Some("SUCCEEDED") => TxStatus::Confirmed,
                _ => TxStatus::Pending,
            },
            _ => TxStatus::Pending,
        }
    }

    /// An unknown hash is a status of its own, not an error
    fn status_response(result: LedgerResult<TransactionStatusResult>) -> LedgerResult<TxStatus> {
        match result {
            Ok(status) => Ok(Self::classify(status)),
            Err(LedgerError::RpcResponse {
                code: TXN_HASH_NOT_FOUND,
                ..
            }) => Ok(TxStatus::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Decode a Cairo 1 `Transfer(from, to, value)` event
    ///
    /// `from` and `to` are keys and the uint256 value is two data felts.
    fn decode_transfer(event: EmittedEvent) -> Option<TransferRecord> {
        if event.keys.len() < 3 || event.data.len() < 2 {
            return None;
        }
        let amount = Uint256::from_felts(&event.data[0], &event.data[1]).ok()?;
        Some(TransferRecord {
            tx_reference: event.transaction_hash,
            recipient: normalize_address(&event.keys[2]),
            amount_raw: amount.as_u128()?,
            block_number: event.block_number,
        })
    }
}

#[async_trait]
impl SettlementLedger for StarknetLedger {
    async fn treasury(&self) -> LedgerResult<TreasuryAccount> {
        self.config.validate()?;
        Ok(TreasuryAccount {
            address: self.config.treasury_address.clone(),
        })
    }

    async fn balance(&self, account: &str) -> LedgerResult<Uint256> {
        // Latest accepted block; the pending view would count in-flight transfers
        let result: Vec<String> = self
            .call(
                "starknet_call",
                serde_json::json!({
                    "request": {
                        "contract_address": self.config.token_address,
                        "entry_point_selector": BALANCE_OF_SELECTOR,
                        "calldata": [account],
                    },
                    "block_id": "latest",
                }),
            )
            .await?;

        let low = result
            .first()
            .ok_or_else(|| LedgerError::InvalidResponse("balanceOf returned no data".to_string()))?;
        let high = result.get(1).map(String::as_str).unwrap_or("0x0");
        Ok(Uint256::from_felts(low, high)?)
    }

    async fn nonce(&self, account: &str) -> LedgerResult<u64> {
        let felt: String = self
            .call(
                "starknet_getNonce",
                serde_json::json!({
                    "block_id": "pending",
                    "contract_address": account,
                }),
            )
            .await?;

        let nonce = parse_felt_u128(&felt)?;
        u64::try_from(nonce)
            .map_err(|_| LedgerError::InvalidResponse(format!("Nonce out of range: {}", felt)))
    }

    async fn submit_transfer(
        &self,
        sender: &TreasuryAccount,
        recipient: &str,
        amount: u128,
        nonce: u64,
    ) -> LedgerResult<String> {
        self.config.validate()?;
        let [low, high] = Uint256::from_u128(amount).to_felts();
        let request = TransferRequest {
            sender: &sender.address,
            token: &self.config.token_address,
            recipient,
            amount: AmountFelts { low, high },
            nonce: format!("{:#x}", nonce),
        };

        let response = self
            .client
            .post(&self.config.signer_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Signer(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Signer(format!("HTTP {} - {}", status, body)));
        }

        let accepted: TransferResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Signer(e.to_string()))?;

        info!(
            tx = %accepted.transaction_hash,
            %recipient,
            amount,
            nonce,
            "Transfer accepted by signer"
        );
        Ok(accepted.transaction_hash)
    }

    async fn transaction_status(&self, tx_reference: &str) -> LedgerResult<TxStatus> {
        let result: Result<TransactionStatusResult, LedgerError> = self
            .call(
                "starknet_getTransactionStatus",
                serde_json::json!({ "transaction_hash": tx_reference }),
            )
            .await;

        Self::status_response(result)
    }

    async fn wait_for_finality(&self, tx_reference: &str) -> LedgerResult<Finality> {
        let outcome = poll_finality(
            self,
            tx_reference,
            self.config.poll_interval(),
            self.config.finality_timeout(),
        )
        .await?;

        if let Finality::Failed { reason } = &outcome {
            warn!(tx = %tx_reference, %reason, "Transfer failed on chain");
        }
        Ok(outcome)
    }

    async fn recent_transfers(&self, sender: &str) -> LedgerResult<Vec<TransferRecord>> {
        let latest = self.block_number().await?;
        let from_block = latest.saturating_sub(self.config.reconcile_lookback_blocks);

        let mut transfers = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let mut filter = serde_json::json!({
                "from_block": { "block_number": from_block },
                "to_block": "latest",
                "address": self.config.token_address,
                "keys": [[TRANSFER_EVENT_SELECTOR], [sender]],
                "chunk_size": EVENTS_CHUNK_SIZE,
            });
            if let Some(token) = &continuation {
                filter["continuation_token"] = serde_json::Value::String(token.clone());
            }

            let page: EventsPage = self
                .call("starknet_getEvents", serde_json::json!({ "filter": filter }))
                .await?;

            transfers.extend(page.events.into_iter().filter_map(Self::decode_transfer));

            match page.continuation_token {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        debug!(
            %sender,
            from_block,
            count = transfers.len(),
            "Fetched outbound transfers"
        );
        Ok(transfers)
    }

    async fn chain_id(&self) -> LedgerResult<String> {
        self.call("starknet_chainId", serde_json::json!([])).await
    }
}
