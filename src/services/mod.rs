pub mod analytics;
pub mod ledger_submitter;
pub mod orchestrator;
pub mod scheduler;

pub use analytics::AnalyticsEngine;
pub use ledger_submitter::{LedgerSubmitter, PriceSubmitter, Sleeper, TokioSleeper};
pub use orchestrator::{CycleOrchestrator, CycleOutcome, CycleReport, CycleStage};
pub use scheduler::{unexpected_exit, Scheduler};
