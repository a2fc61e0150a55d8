pub mod price_record_repository;
pub mod record_store;
pub mod yield_snapshot_repository;

// Re-export all repositories for convenient access
pub use price_record_repository::PriceRecordRepository;
pub use record_store::{MonotonicClock, PgRecordStore, RecordStore};
pub use yield_snapshot_repository::YieldSnapshotRepository;
