//! API server entry point: wires the stores, caches, clients and managers,
//! then serves the HTTP surface.

use eyre::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use uniswap_fee_tracker::api::{self, AppState};
use uniswap_fee_tracker::batch_processor::BatchProcessorImpl;
use uniswap_fee_tracker::cache::{RedisCache, RedisJobCache, RedisRateCache};
use uniswap_fee_tracker::client::{EtherscanClient, KlineClient};
use uniswap_fee_tracker::config::Config;
use uniswap_fee_tracker::price_manager::PriceManager;
use uniswap_fee_tracker::tx_manager::TransactionManager;
use uniswap_fee_tracker::tx_store::PgTransactionStore;

/// Redis logical databases: rates in 0, jobs in 2.
const RATE_CACHE_DB: u8 = 0;
const JOB_CACHE_DB: u8 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("failed to load configuration")?;

    let tx_store = Arc::new(
        PgTransactionStore::connect(&config.database_url())
            .await
            .context("failed to connect to the database")?,
    );

    let rate_cache = RedisCache::connect(&config.redis_connection_url(RATE_CACHE_DB))
        .await
        .context("failed to connect to the rate cache")?;
    let job_cache = RedisCache::connect(&config.redis_connection_url(JOB_CACHE_DB))
        .await
        .context("failed to connect to the job cache")?;

    let price_manager = Arc::new(PriceManager::new(
        Arc::new(RedisRateCache::new(rate_cache)),
        Arc::new(KlineClient::new()),
    ));

    let tx_manager = Arc::new(TransactionManager::new(
        Arc::new(EtherscanClient::new(
            config.etherscan_api_key.clone(),
            config.pool_address.clone(),
        )),
        price_manager,
    ));

    let job_store = Arc::new(RedisJobCache::new(job_cache));
    let processor = Arc::new(BatchProcessorImpl::new(
        tx_store.clone(),
        job_store.clone(),
        tx_manager,
    ));

    let state = AppState {
        tx_store,
        job_store,
        processor,
    };

    info!(port = %config.server_port, "starting API server");
    api::serve(&config.server_port, state)
        .await
        .context("HTTP server failed")
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();
}
