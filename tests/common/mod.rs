//! Shared fixtures and builders for the integration tests.
#![allow(dead_code)]

pub mod mocks;

use chrono::{DateTime, Utc};
use ethers::types::U256;
use uniswap_fee_tracker::types::{TransactionData, TxWithPrice};
use uniswap_fee_tracker::utils::unix_to_datetime;

pub const BASE_TS: i64 = 1_700_000_000;

pub fn ts(offset: i64) -> DateTime<Utc> {
    unix_to_datetime(BASE_TS + offset)
}

/// A deterministic raw transaction; `i` seeds the hash and block number.
pub fn tx_data(i: u64, ts_offset: i64) -> TransactionData {
    TransactionData {
        block_number: 18_000_000 + i,
        hash: format!("0x{i:064x}"),
        gas_used: 121_276,
        gas_price_wei: U256::from(97_615_021_742u64),
        timestamp: ts(ts_offset),
    }
}

/// `n` transactions with distinct hashes, all stamped inside one minute so a
/// single hot price serves them.
pub fn unique_txs(n: usize) -> Vec<TransactionData> {
    (0..n as u64).map(|i| tx_data(i, (i % 50) as i64)).collect()
}

pub fn enriched(i: u64, ts_offset: i64) -> TxWithPrice {
    let data = tx_data(i, ts_offset);
    let fee_eth = 97_615_021_742.0 / 1e18 * data.gas_used as f64;
    TxWithPrice {
        data,
        eth_usdt_price: 2000.0,
        fee_eth,
        fee_usdt: fee_eth * 2000.0,
    }
}
