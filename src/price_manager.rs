//! # Three-Tier Price Manager
//!
//! Resolves the ETH/USDT rate for a timestamp through three tiers, cheapest
//! first:
//!
//! 1. a hot `(timestamp, rate)` slot guarded by a read/write lock — valid
//!    while the requested timestamp is within 60 s of the cached one, served
//!    with zero I/O;
//! 2. the shared rate cache, queried within its ±5-minute window;
//! 3. the origin market-data API.
//!
//! Values resolved from the lower tiers are promoted upward. Writing a fresh
//! origin value into the rate cache is best-effort: a cache outage must not
//! take the pricing path down with it.

use crate::cache::RateStore;
use crate::client::PriceClient;
use crate::errors::PriceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{trace, warn};

/// How far the hot value may drift from the requested timestamp.
const HOT_VALIDITY_SECS: i64 = 60;

#[derive(Debug, Clone, Copy)]
struct ConversionRate {
    timestamp: DateTime<Utc>,
    rate: f64,
}

/// The pricing seam consumed by the transaction manager.
#[async_trait]
pub trait PriceSource: Send + Sync + std::fmt::Debug {
    async fn get_eth_usdt(&self, ts: DateTime<Utc>) -> Result<f64, PriceError>;
}

pub struct PriceManager {
    rate_cache: Arc<dyn RateStore>,
    price_client: Arc<dyn PriceClient>,
    hot: RwLock<Option<ConversionRate>>,
}

impl PriceManager {
    pub fn new(rate_cache: Arc<dyn RateStore>, price_client: Arc<dyn PriceClient>) -> Self {
        Self {
            rate_cache,
            price_client,
            hot: RwLock::new(None),
        }
    }

    async fn promote(&self, ts: DateTime<Utc>, rate: f64) {
        let mut hot = self.hot.write().await;
        *hot = Some(ConversionRate { timestamp: ts, rate });
    }
}

impl std::fmt::Debug for PriceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceManager").finish_non_exhaustive()
    }
}

#[async_trait]
impl PriceSource for PriceManager {
    async fn get_eth_usdt(&self, ts: DateTime<Utc>) -> Result<f64, PriceError> {
        // Tier 1: hot slot. Readers do not block each other.
        {
            let hot = self.hot.read().await;
            if let Some(last) = *hot {
                if (ts - last.timestamp).num_seconds().abs() <= HOT_VALIDITY_SECS {
                    trace!(target: "price_manager", rate = last.rate, "hot value hit");
                    return Ok(last.rate);
                }
            }
        }

        // Tier 2: shared rate cache. Any cache failure is treated as a miss.
        match self.rate_cache.get_rate(ts).await {
            Ok(rate) => {
                trace!(target: "price_manager", rate, "rate cache hit");
                self.promote(ts, rate).await;
                return Ok(rate);
            }
            Err(e) => {
                trace!(target: "price_manager", error = %e, "rate cache miss");
            }
        }

        // Tier 3: origin API.
        let kline = self.price_client.get_eth_usdt(ts).await?;
        let rate = kline.close_price;

        if let Err(e) = self.rate_cache.store_rate(ts, rate).await {
            warn!(target: "price_manager", error = %e, "could not store rate in cache");
        }
        self.promote(ts, rate).await;

        Ok(rate)
    }
}
