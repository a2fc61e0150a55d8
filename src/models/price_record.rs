use super::ChainReference;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Price record model, one row of `price_oracle` per persisted observation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PriceRecord {
    pub id: Uuid,
    pub symbol: String,
    pub price_usd: Decimal,
    pub tx_hash: String, // Stored as TEXT, use ChainReference for type safety
    pub created_at: DateTime<Utc>,
}

impl PriceRecord {
    /// Create a new PriceRecord observed at `observed_at`
    pub fn new(
        symbol: impl Into<String>,
        price_usd: Decimal,
        chain_reference: &ChainReference,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            price_usd,
            tx_hash: chain_reference.to_db_string(),
            created_at: observed_at,
        }
    }

    /// Get the chain reference as an enum
    pub fn chain_reference(&self) -> Result<ChainReference, String> {
        self.tx_hash.parse()
    }
}
