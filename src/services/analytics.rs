use crate::error::AnalyticsError;
use crate::models::{ProtocolRate, SnapshotCandidate};
use rust_decimal::Decimal;

/// Multiplier applied to every base APY: `1 + (1 - price)`.
///
/// Lower prices raise the multiplier; prices above 2.0 make it negative.
pub fn price_impact(price: Decimal) -> Option<Decimal> {
    Decimal::ONE
        .checked_sub(price)
        .and_then(|deviation| Decimal::ONE.checked_add(deviation))
}

/// Per-protocol APY for `price`, clamped to `[min_apy, max_apy]`, in
/// protocol order
pub fn compute_snapshots(
    price: Decimal,
    protocols: &[ProtocolRate],
    min_apy: Decimal,
    max_apy: Decimal,
) -> Result<Vec<SnapshotCandidate>, AnalyticsError> {
    if price < Decimal::ZERO {
        return Err(AnalyticsError::InvalidInput(format!(
            "price must be non-negative, got {}",
            price
        )));
    }
    if min_apy > max_apy {
        return Err(AnalyticsError::InvalidInput(format!(
            "APY band is inverted: [{}, {}]",
            min_apy, max_apy
        )));
    }

    let impact = price_impact(price)
        .ok_or_else(|| AnalyticsError::InvalidInput(format!("price {} out of range", price)))?;

    protocols
        .iter()
        .map(|protocol| {
            let raw = protocol.base_apy.checked_mul(impact).ok_or_else(|| {
                AnalyticsError::InvalidInput(format!(
                    "APY for {} overflows at price {}",
                    protocol.name, price
                ))
            })?;

            Ok(SnapshotCandidate {
                protocol_name: protocol.name.clone(),
                apy: raw.clamp(min_apy, max_apy),
                price_impact: impact,
            })
        })
        .collect()
}

/// Price → yield snapshot model, configured once at startup
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    protocols: Vec<ProtocolRate>,
    min_apy: Decimal,
    max_apy: Decimal,
}

impl AnalyticsEngine {
    pub fn new(protocols: Vec<ProtocolRate>, min_apy: Decimal, max_apy: Decimal) -> Self {
        Self {
            protocols,
            min_apy,
            max_apy,
        }
    }

    pub fn protocols(&self) -> &[ProtocolRate] {
        &self.protocols
    }

    pub fn bounds(&self) -> (Decimal, Decimal) {
        (self.min_apy, self.max_apy)
    }

    pub fn compute_snapshots(&self, price: Decimal) -> Result<Vec<SnapshotCandidate>, AnalyticsError> {
        compute_snapshots(price, &self.protocols, self.min_apy, self.max_apy)
    }
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new(ProtocolRate::defaults(), Decimal::new(50, 1), Decimal::new(500, 1))
    }
}
