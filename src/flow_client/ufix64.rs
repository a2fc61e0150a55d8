//! Cadence `UFix64`: unsigned 64-bit fixed point with 8 fractional digits.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

pub const UFIX64_SCALE: u32 = 8;
const UFIX64_FACTOR: u64 = 100_000_000;

/// Raw `UFix64` value for `price`, rounded toward zero at the 8th digit
pub fn encode_ufix64(price: Decimal) -> Result<u64, String> {
    if price <= Decimal::ZERO {
        return Err(format!("price must be positive, got {}", price));
    }
    price
        .checked_mul(Decimal::from(UFIX64_FACTOR))
        .map(|scaled| scaled.trunc())
        .and_then(|scaled| scaled.to_u64())
        .ok_or_else(|| format!("price {} does not fit in UFix64", price))
}

pub fn decode_ufix64(raw: u64) -> Decimal {
    Decimal::from_i128_with_scale(raw as i128, UFIX64_SCALE)
}

/// Canonical Cadence literal, e.g. `0.27840000`
pub fn format_ufix64(raw: u64) -> String {
    format!("{}.{:08}", raw / UFIX64_FACTOR, raw % UFIX64_FACTOR)
}

/// JSON-Cadence encoded transaction argument
pub fn ufix64_argument(raw: u64) -> Vec<u8> {
    serde_json::json!({
        "type": "UFix64",
        "value": format_ufix64(raw),
    })
    .to_string()
    .into_bytes()
}
