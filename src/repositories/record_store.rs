use super::{PriceRecordRepository, YieldSnapshotRepository};
use crate::error::StoreError;
use crate::models::{ChainReference, PriceRecord, SnapshotCandidate, SnapshotOutcome, YieldSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Append-only writer for price history and the analytics derived from it
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist one price observation. Either the row is fully written or
    /// nothing is.
    async fn insert_price_record(
        &self,
        symbol: &str,
        price_usd: Decimal,
        chain_reference: &ChainReference,
    ) -> Result<PriceRecord, StoreError>;

    /// Persist one snapshot per candidate, independently. Returns an outcome
    /// for every candidate, in candidate order.
    async fn insert_yield_snapshots(
        &self,
        price_record_id: Uuid,
        reference_price: Decimal,
        candidates: &[SnapshotCandidate],
    ) -> Vec<SnapshotOutcome>;
}

/// Hands out observation timestamps that never go backwards, even if the
/// wall clock does.
#[derive(Default)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp, truncated to the microsecond precision Postgres keeps
    pub fn next(&self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let stamp = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }
}

/// Postgres-backed [`RecordStore`]
pub struct PgRecordStore {
    price_records: PriceRecordRepository,
    snapshots: YieldSnapshotRepository,
    clock: MonotonicClock,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            price_records: PriceRecordRepository::new(pool.clone()),
            snapshots: YieldSnapshotRepository::new(pool),
            clock: MonotonicClock::new(),
        }
    }

    pub fn price_records(&self) -> &PriceRecordRepository {
        &self.price_records
    }

    pub fn snapshots(&self) -> &YieldSnapshotRepository {
        &self.snapshots
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_price_record(
        &self,
        symbol: &str,
        price_usd: Decimal,
        chain_reference: &ChainReference,
    ) -> Result<PriceRecord, StoreError> {
        let record = PriceRecord::new(symbol, price_usd, chain_reference, self.clock.next());
        let stored = self.price_records.insert(&record).await?;
        info!(record_id = %stored.id, symbol = %stored.symbol, "Price saved to database");
        Ok(stored)
    }

    async fn insert_yield_snapshots(
        &self,
        price_record_id: Uuid,
        reference_price: Decimal,
        candidates: &[SnapshotCandidate],
    ) -> Vec<SnapshotOutcome> {
        let mut outcomes = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let snapshot = YieldSnapshot::from_candidate(
                candidate,
                reference_price,
                price_record_id,
                self.clock.next(),
            );

            let result = self.snapshots.insert(&snapshot).await.map_err(StoreError::from);
            match &result {
                Ok(id) => info!(
                    protocol = %candidate.protocol_name,
                    apy = %candidate.apy,
                    price_impact = %candidate.price_impact,
                    snapshot_id = %id,
                    "APY snapshot saved"
                ),
                Err(e) => warn!(
                    protocol = %candidate.protocol_name,
                    error = %e,
                    "Failed to save APY snapshot, continuing with remaining protocols"
                ),
            }

            outcomes.push(SnapshotOutcome {
                protocol_name: candidate.protocol_name.clone(),
                apy: candidate.apy,
                result,
            });
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let mut previous = clock.next();
        for _ in 0..1000 {
            let next = clock.next();
            assert!(next >= previous);
            previous = next;
        }
    }

    #[test]
    fn test_monotonic_clock_holds_future_stamp() {
        let clock = MonotonicClock::new();
        let future = Utc::now() + chrono::Duration::hours(1);
        *clock.last.lock().unwrap() = Some(future);
        assert_eq!(clock.next(), future);
    }
}
