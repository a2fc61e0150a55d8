//! Domain models for the oracle updater.
//!
//! Database-backed rows for the two append-only tables plus the value
//! types that flow between the stages of an update cycle.

pub mod chain_reference;
pub mod price_record;
pub mod yield_snapshot;

// Re-export all models for convenient access
pub use chain_reference::{ChainReference, DegradedReason};
pub use price_record::PriceRecord;
pub use yield_snapshot::{ProtocolRate, SnapshotCandidate, SnapshotOutcome, YieldSnapshot};
