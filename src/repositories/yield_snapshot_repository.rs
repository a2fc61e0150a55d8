use crate::models::YieldSnapshot;
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Repository for `protocol_apy_snapshots` rows
pub struct YieldSnapshotRepository {
    pool: PgPool,
}

impl YieldSnapshotRepository {
    /// Create a new YieldSnapshotRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert one snapshot. The foreign key on `price_oracle_id` rejects
    /// orphans with SQLSTATE 23503.
    pub async fn insert(&self, snapshot: &YieldSnapshot) -> SqlxResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO protocol_apy_snapshots
                (id, protocol_name, apy, flow_price, price_oracle_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(snapshot.id)
        .bind(&snapshot.protocol_name)
        .bind(snapshot.apy)
        .bind(snapshot.flow_price)
        .bind(snapshot.price_oracle_id)
        .bind(snapshot.created_at)
        .fetch_one(&self.pool)
        .await
    }

    /// All snapshots anchored to one price record, in insertion order
    pub async fn find_by_price_record(&self, price_oracle_id: Uuid) -> SqlxResult<Vec<YieldSnapshot>> {
        sqlx::query_as::<_, YieldSnapshot>(
            r#"
            SELECT id, protocol_name, apy, flow_price, price_oracle_id, created_at
            FROM protocol_apy_snapshots
            WHERE price_oracle_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(price_oracle_id)
        .fetch_all(&self.pool)
        .await
    }
}
