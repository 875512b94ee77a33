//! Binance-backed [`PriceClient`].
//!
//! Fetches the 15-minute ETHUSDT candle ending at the requested timestamp.
//! The kline endpoint sometimes answers an empty array for a valid window, so
//! the fetch retries a fixed number of times with a flat backoff, paying a
//! rate-limit token per attempt.

use crate::client::{KlineData, PriceClient};
use crate::errors::ClientError;
use crate::rate_limiter::{per_second_limiter, RateLimitedHttpClient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";

const SYMBOL: &str = "ETHUSDT";
const CANDLE_INTERVAL: &str = "15m";

/// Kline calls cost 2 of the 6000 request weights per minute, allowing
/// roughly 50 calls per second.
const RATE_PER_SECOND: u32 = 50;
const BURST: u32 = 30;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Index of the close price within a candle tuple
/// `[open_time, open, high, low, close, …]`.
const CLOSE_PRICE_INDEX: usize = 4;

#[derive(Debug)]
pub struct KlineClient {
    http: RateLimitedHttpClient,
    base_url: String,
}

impl KlineClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// Same client pointed at a different endpoint; used by tests.
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: RateLimitedHttpClient::new(vec![per_second_limiter(RATE_PER_SECOND, BURST)]),
            base_url,
        }
    }
}

impl Default for KlineClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceClient for KlineClient {
    async fn get_eth_usdt(&self, ts: DateTime<Utc>) -> Result<KlineData, ClientError> {
        if ts.timestamp() == 0 {
            return Err(ClientError::InvalidTimestamp(
                "candle timestamp must be non-zero".into(),
            ));
        }

        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&endTime={}&limit=1",
            self.base_url,
            SYMBOL,
            CANDLE_INTERVAL,
            ts.timestamp_millis()
        );

        for attempt in 1..=MAX_ATTEMPTS {
            debug!(target: "kline_client", attempt, end_time = ts.timestamp_millis(), "fetching candle");
            let candles: Vec<serde_json::Value> = self.http.get_json(&url).await?;

            if let Some(candle) = candles.first() {
                return decode_close_price(candle);
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
        }

        Err(ClientError::EmptyAfterRetries(MAX_ATTEMPTS))
    }
}

fn decode_close_price(candle: &serde_json::Value) -> Result<KlineData, ClientError> {
    let close = candle
        .get(CLOSE_PRICE_INDEX)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ClientError::Decode("candle tuple missing close price".into()))?;

    let close_price = close
        .parse::<f64>()
        .map_err(|e| ClientError::Decode(format!("close price '{close}': {e}")))?;

    Ok(KlineData { close_price })
}
