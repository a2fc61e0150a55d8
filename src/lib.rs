//! Flow Oracle Updater Library
//!
//! Periodically pulls the FLOW/USD spot price, commits it to the on-chain
//! `PriceOracle` contract, persists it, and derives per-protocol staking
//! APY snapshots from it. Exposed as a library for tests and the binary.

pub mod config;
pub mod database;
pub mod error;
pub mod flow_client;
pub mod models;
pub mod price_feed;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use services::{CycleOrchestrator, CycleOutcome, Scheduler};
