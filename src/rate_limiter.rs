//! # Rate-Limited HTTP Client
//!
//! A thin GET client that gates every outbound request behind one or more
//! token-bucket limiters. Some upstream APIs publish several ceilings at once
//! (per-second and per-day); composing limiters means a request goes out only
//! after *every* attached bucket grants a token. No retries happen at this
//! layer — retry policy belongs to callers that know whether a request is
//! idempotent.

use crate::errors::ClientError;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Timeout applied to every outbound HTTP request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds a limiter granting `rate_per_second` tokens per second with the
/// given burst capacity.
pub fn per_second_limiter(rate_per_second: u32, burst: u32) -> Arc<DefaultDirectRateLimiter> {
    let quota = Quota::per_second(NonZeroU32::new(rate_per_second.max(1)).unwrap())
        .allow_burst(NonZeroU32::new(burst.max(1)).unwrap());
    Arc::new(RateLimiter::direct(quota))
}

/// Builds a limiter replenishing one token per `period`, for fractional rates
/// such as a daily budget expressed as ~1.15 req/s.
pub fn per_period_limiter(period: Duration, burst: u32) -> Arc<DefaultDirectRateLimiter> {
    let quota = Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::new(1).unwrap()))
        .allow_burst(NonZeroU32::new(burst.max(1)).unwrap());
    Arc::new(RateLimiter::direct(quota))
}

/// GET client gated by a chain of token-bucket limiters.
#[derive(Debug, Clone)]
pub struct RateLimitedHttpClient {
    http: Client,
    limiters: Vec<Arc<DefaultDirectRateLimiter>>,
}

impl RateLimitedHttpClient {
    pub fn new(limiters: Vec<Arc<DefaultDirectRateLimiter>>) -> Self {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent("uniswap-fee-tracker/0.1")
            .build()
            .expect("Failed to build HTTP client");
        Self { http, limiters }
    }

    /// Awaits a token from every attached limiter, in order. Each wait is a
    /// plain future, so dropping the call (context cancellation) abandons the
    /// wait without consuming tokens that were not yet granted.
    pub async fn throttle(&self) {
        for limiter in &self.limiters {
            limiter.until_ready().await;
        }
    }

    /// Issues a rate-limited GET and decodes the JSON body into `T`.
    ///
    /// Non-2xx responses surface as [`ClientError::HttpStatus`]; body decoding
    /// failures as [`ClientError::Decode`].
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        self.throttle().await;
        trace!(target: "rate_limited_client", %url, "dispatching GET");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::HttpStatus(status));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}
