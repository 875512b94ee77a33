//! Etherscan-backed [`TransactionClient`].
//!
//! Two ceilings apply on the free plan: 5 calls/second, and 100,000
//! calls/day (~1.15/s sustained). Both are modeled as composed token buckets
//! so a burst can run ahead of the daily average without ever violating
//! either limit.

use crate::client::{BlockSide, TransactionClient};
use crate::errors::ClientError;
use crate::rate_limiter::{per_period_limiter, per_second_limiter, RateLimitedHttpClient};
use crate::types::TransactionData;
use crate::utils::{parse_unix_time, unix_to_datetime};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::types::U256;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://api.etherscan.io/api";

/// Per-second ceiling: 5 req/s, burst 5.
const SECOND_RATE: u32 = 5;
const SECOND_BURST: u32 = 5;
/// Daily ceiling of 100k calls ≈ 1.15 req/s sustained, burst 1000.
const DAILY_TOKEN_PERIOD: Duration = Duration::from_millis(870);
const DAILY_BURST: u32 = 1000;

/// The indexer reports an exhausted page range as a server-side error with
/// this message rather than an empty result.
const NO_TRANSACTIONS_SENTINEL: &str = "No transactions found";

#[derive(Debug)]
pub struct EtherscanClient {
    http: RateLimitedHttpClient,
    base_url: String,
    api_key: String,
    pool_address: String,
}

#[derive(Debug, Deserialize)]
struct ReceiptEnvelope {
    result: Option<ReceiptDetails>,
}

#[derive(Debug, Deserialize)]
struct ReceiptDetails {
    #[serde(rename = "blockNumber")]
    block_number: String,
    #[serde(rename = "transactionHash")]
    transaction_hash: String,
    #[serde(rename = "gasUsed")]
    gas_used: String,
    #[serde(rename = "effectiveGasPrice")]
    effective_gas_price: String,
}

#[derive(Debug, Deserialize)]
struct TokenTxEnvelope {
    status: String,
    message: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct TokenTxRow {
    #[serde(rename = "blockNumber")]
    block_number: String,
    #[serde(rename = "timeStamp")]
    time_stamp: String,
    hash: String,
    #[serde(rename = "gasPrice")]
    gas_price: String,
    #[serde(rename = "gasUsed")]
    gas_used: String,
}

#[derive(Debug, Deserialize)]
struct BlockNumberEnvelope {
    status: String,
    message: String,
    result: String,
}

impl EtherscanClient {
    pub fn new(api_key: String, pool_address: String) -> Self {
        Self::with_base_url(api_key, pool_address, DEFAULT_BASE_URL.to_string())
    }

    /// Same client pointed at a different endpoint; used by tests.
    pub fn with_base_url(api_key: String, pool_address: String, base_url: String) -> Self {
        let http = RateLimitedHttpClient::new(vec![
            per_second_limiter(SECOND_RATE, SECOND_BURST),
            per_period_limiter(DAILY_TOKEN_PERIOD, DAILY_BURST),
        ]);
        Self {
            http,
            base_url,
            api_key,
            pool_address,
        }
    }

    fn url(&self, params: &[(&str, String)]) -> String {
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.base_url, query)
    }
}

#[async_trait]
impl TransactionClient for EtherscanClient {
    async fn get_receipt(&self, hash: &str) -> Result<TransactionData, ClientError> {
        let url = self.url(&[
            ("module", "proxy".into()),
            ("action", "eth_getTransactionReceipt".into()),
            ("txhash", hash.to_string()),
            ("apikey", self.api_key.clone()),
        ]);

        let envelope: ReceiptEnvelope = self
            .http
            .get_json(&url)
            .await
            .map_err(classify_upstream_status)?;
        let receipt = envelope
            .result
            .ok_or_else(|| ClientError::NotFound(format!("transaction {hash}")))?;

        Ok(TransactionData {
            block_number: parse_hex_u64("blockNumber", &receipt.block_number)?,
            hash: receipt.transaction_hash,
            gas_used: parse_hex_u64("gasUsed", &receipt.gas_used)?,
            gas_price_wei: parse_hex_u256("effectiveGasPrice", &receipt.effective_gas_price)?,
            // Receipts do not carry the block timestamp on the wire.
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        })
    }

    async fn get_latest_swap(&self) -> Result<TransactionData, ClientError> {
        let mut transfers = self.list_transfers(1, None, None, 1).await?;
        if transfers.is_empty() {
            return Err(ClientError::NotFound("latest pool transaction".into()));
        }
        Ok(transfers.swap_remove(0))
    }

    async fn list_transfers(
        &self,
        batch_size: usize,
        start_block: Option<u64>,
        end_block: Option<u64>,
        page: usize,
    ) -> Result<Vec<TransactionData>, ClientError> {
        let mut params = vec![
            ("module", "account".to_string()),
            ("action", "tokentx".to_string()),
            ("address", self.pool_address.clone()),
            ("apikey", self.api_key.clone()),
            ("sort", "desc".to_string()),
            ("offset", batch_size.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(start) = start_block {
            params.push(("startblock", start.to_string()));
        }
        if let Some(end) = end_block {
            params.push(("endblock", end.to_string()));
        }

        let envelope: TokenTxEnvelope = self.http.get_json(&self.url(&params)).await?;
        if envelope.status != "1" {
            if envelope.message.contains(NO_TRANSACTIONS_SENTINEL) {
                return Err(ClientError::EndOfPages);
            }
            return Err(ClientError::TransientUpstream(format!(
                "indexer error: {}",
                envelope.message
            )));
        }

        let rows: Vec<TokenTxRow> = serde_json::from_value(envelope.result)
            .map_err(|e| ClientError::Decode(format!("token transfer listing: {e}")))?;

        // Rows that fail field decoding are dropped individually; one bad row
        // must not invalidate the page.
        let mut transfers = Vec::with_capacity(rows.len());
        for row in rows {
            match convert_row(row) {
                Ok(tx) => transfers.push(tx),
                Err(e) => warn!(target: "etherscan_client", error = %e, "skipping undecodable transfer row"),
            }
        }
        Ok(transfers)
    }

    async fn block_by_time(
        &self,
        ts: DateTime<Utc>,
        side: BlockSide,
    ) -> Result<u64, ClientError> {
        let url = self.url(&[
            ("module", "block".into()),
            ("action", "getblocknobytime".into()),
            ("timestamp", ts.timestamp().to_string()),
            ("closest", side.as_str().into()),
            ("apikey", self.api_key.clone()),
        ]);

        let envelope: BlockNumberEnvelope = self.http.get_json(&url).await?;
        if envelope.status != "1" {
            return Err(ClientError::TransientUpstream(format!(
                "block lookup failed: {}",
                envelope.message
            )));
        }

        envelope
            .result
            .parse::<u64>()
            .map_err(|e| ClientError::Decode(format!("block number '{}': {e}", envelope.result)))
    }
}

/// Classifies a non-2xx status by retryability: a client error will not
/// succeed on retry, a server error may.
fn classify_upstream_status(e: ClientError) -> ClientError {
    match e {
        ClientError::HttpStatus(status) if status.is_client_error() => {
            ClientError::PermanentUpstream(format!("indexer rejected the request: {status}"))
        }
        ClientError::HttpStatus(status) if status.is_server_error() => {
            ClientError::TransientUpstream(format!("indexer unavailable: {status}"))
        }
        other => other,
    }
}

fn convert_row(row: TokenTxRow) -> Result<TransactionData, ClientError> {
    let timestamp = parse_unix_time(&row.time_stamp)
        .map_err(|e| ClientError::Decode(format!("timeStamp '{}': {e}", row.time_stamp)))?;

    Ok(TransactionData {
        block_number: parse_dec_u64("blockNumber", &row.block_number)?,
        hash: row.hash,
        gas_used: parse_dec_u64("gasUsed", &row.gas_used)?,
        gas_price_wei: U256::from_dec_str(&row.gas_price)
            .map_err(|e| ClientError::Decode(format!("gasPrice '{}': {e}", row.gas_price)))?,
        timestamp: unix_to_datetime(timestamp),
    })
}

fn parse_dec_u64(field: &str, value: &str) -> Result<u64, ClientError> {
    value
        .parse::<u64>()
        .map_err(|e| ClientError::Decode(format!("{field} '{value}': {e}")))
}

fn parse_hex_u64(field: &str, value: &str) -> Result<u64, ClientError> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|e| ClientError::Decode(format!("{field} '{value}': {e}")))
}

fn parse_hex_u256(field: &str, value: &str) -> Result<U256, ClientError> {
    U256::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|e| ClientError::Decode(format!("{field} '{value}': {e}")))
}
