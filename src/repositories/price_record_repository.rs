use crate::models::PriceRecord;
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Repository for `price_oracle` rows
pub struct PriceRecordRepository {
    pool: PgPool,
}

impl PriceRecordRepository {
    /// Create a new PriceRecordRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a fully built record; a single statement, so all-or-nothing
    pub async fn insert(&self, record: &PriceRecord) -> SqlxResult<PriceRecord> {
        sqlx::query_as::<_, PriceRecord>(
            r#"
            INSERT INTO price_oracle (id, symbol, price_usd, tx_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, symbol, price_usd, tx_hash, created_at
            "#,
        )
        .bind(record.id)
        .bind(&record.symbol)
        .bind(record.price_usd)
        .bind(&record.tx_hash)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
    }

    /// Find a record by UUID
    pub async fn find_by_id(&self, id: Uuid) -> SqlxResult<Option<PriceRecord>> {
        sqlx::query_as::<_, PriceRecord>(
            r#"
            SELECT id, symbol, price_usd, tx_hash, created_at
            FROM price_oracle
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Most recent records for a symbol, newest first
    pub async fn find_recent(&self, symbol: &str, limit: i64) -> SqlxResult<Vec<PriceRecord>> {
        sqlx::query_as::<_, PriceRecord>(
            r#"
            SELECT id, symbol, price_usd, tx_hash, created_at
            FROM price_oracle
            WHERE symbol = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
