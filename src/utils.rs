//! Conversion and validation helpers shared by the clients, the enrichment
//! path, and the API layer.

use chrono::{DateTime, TimeZone, Utc};
use ethers::types::U256;

/// Converts a wei-denominated amount to ETH as `f64` (1 ETH = 10^18 wei).
///
/// Amounts above `u128::MAX` go through the string formatter to avoid
/// truncation before the float conversion.
pub fn wei_to_eth(wei: U256) -> f64 {
    if wei.is_zero() {
        return 0.0;
    }
    if wei > U256::from(u128::MAX) {
        ethers::utils::format_units(wei, 18u32)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(f64::MAX)
    } else {
        wei.as_u128() as f64 / 1e18
    }
}

/// Validates and normalizes a transaction hash: surrounding whitespace is
/// trimmed, then the value must match `0x` followed by exactly 64 hex digits.
pub fn sanitize_tx_hash(hash: &str) -> Option<String> {
    let hash = hash.trim();
    let hex = hash.strip_prefix("0x")?;
    if hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(hash.to_string())
    } else {
        None
    }
}

/// Parses a decimal string into unix epoch seconds.
pub fn parse_unix_time(value: &str) -> Result<i64, std::num::ParseIntError> {
    value.parse::<i64>()
}

/// Formats unix epoch seconds back into the decimal wire form.
pub fn format_unix_time(secs: i64) -> String {
    secs.to_string()
}

/// Converts unix epoch seconds into a UTC instant, clamping out-of-range
/// values to the epoch.
pub fn unix_to_datetime(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
