use crate::error::StoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A protocol and the base APY its snapshot is derived from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolRate {
    pub name: String,
    pub base_apy: Decimal,
}

impl ProtocolRate {
    pub fn new(name: impl Into<String>, base_apy: Decimal) -> Self {
        Self {
            name: name.into(),
            base_apy,
        }
    }

    /// Reference staking protocols, in persisted order
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("ankr", Decimal::new(125, 1)),
            Self::new("increment", Decimal::new(153, 1)),
            Self::new("figment", Decimal::new(108, 1)),
        ]
    }
}

/// Analytics output for one protocol, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCandidate {
    pub protocol_name: String,
    pub apy: Decimal,
    pub price_impact: Decimal,
}

/// Yield snapshot model, one row of `protocol_apy_snapshots`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct YieldSnapshot {
    pub id: Uuid,
    pub protocol_name: String,
    pub apy: Decimal,
    pub flow_price: Decimal, // Reference price the APY was computed from
    pub price_oracle_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl YieldSnapshot {
    /// Build the row for a candidate anchored to `price_oracle_id`
    pub fn from_candidate(
        candidate: &SnapshotCandidate,
        reference_price: Decimal,
        price_oracle_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            protocol_name: candidate.protocol_name.clone(),
            apy: candidate.apy,
            flow_price: reference_price,
            price_oracle_id,
            created_at,
        }
    }
}

/// Per-protocol result of a best-effort snapshot batch
#[derive(Debug, Clone)]
pub struct SnapshotOutcome {
    pub protocol_name: String,
    pub apy: Decimal,
    pub result: Result<Uuid, StoreError>,
}

impl SnapshotOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}
