//! Live-tail entry point: anchors at the pool's current head and records new
//! swaps once a minute until interrupted.

use eyre::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use uniswap_fee_tracker::cache::{RedisCache, RedisRateCache};
use uniswap_fee_tracker::client::{EtherscanClient, KlineClient};
use uniswap_fee_tracker::config::Config;
use uniswap_fee_tracker::live_recorder::LiveRecorder;
use uniswap_fee_tracker::price_manager::PriceManager;
use uniswap_fee_tracker::tx_manager::TransactionManager;
use uniswap_fee_tracker::tx_store::PgTransactionStore;

const RATE_CACHE_DB: u8 = 0;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let tx_store = Arc::new(
        PgTransactionStore::connect(&config.database_url())
            .await
            .context("failed to connect to the database")?,
    );

    let rate_cache = RedisCache::connect(&config.redis_connection_url(RATE_CACHE_DB))
        .await
        .context("failed to connect to the rate cache")?;

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

    let recorder = LiveRecorder::new(tx_manager, tx_store)
        .await
        .context("failed to anchor the live recorder")?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                shutdown.cancel();
            }
        }
    });

    recorder.run(shutdown).await;
    info!("live recorder stopped");
    Ok(())
}
