use crate::error::{AnalyticsError, PriceFetchError, StoreError, SubmitError};
use crate::models::{ChainReference, PriceRecord, SnapshotOutcome};
use crate::price_feed::PriceSource;
use crate::repositories::RecordStore;
use crate::services::analytics::AnalyticsEngine;
use crate::services::ledger_submitter::PriceSubmitter;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// States of a single update cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Fetching,
    ChainUpdate,
    ChainSkipped,
    Persisting,
    Analyzing,
    Done,
    Failed,
}

impl CycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStage::Fetching => "fetching",
            CycleStage::ChainUpdate => "chain_update",
            CycleStage::ChainSkipped => "chain_skipped",
            CycleStage::Persisting => "persisting",
            CycleStage::Analyzing => "analyzing",
            CycleStage::Done => "done",
            CycleStage::Failed => "failed",
        }
    }
}

/// Everything a successful cycle produced
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub price: Decimal,
    pub chain_reference: ChainReference,
    pub submit_error: Option<SubmitError>,
    pub price_record: PriceRecord,
    pub snapshots: Vec<SnapshotOutcome>,
    pub analytics_error: Option<AnalyticsError>,
}

impl CycleReport {
    pub fn snapshots_written(&self) -> usize {
        self.snapshots.iter().filter(|s| s.is_ok()).count()
    }

    pub fn snapshots_failed(&self) -> usize {
        self.snapshots.len() - self.snapshots_written()
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// Nothing was written and no transaction was sent
    FetchFailed { cycle: u64, error: PriceFetchError },
    /// Ledger step ran (or was skipped) but the anchor record was not stored
    PersistFailed {
        cycle: u64,
        price: Decimal,
        chain_reference: ChainReference,
        error: StoreError,
    },
    /// Price record persisted; analytics may be partial
    Completed(CycleReport),
}

impl CycleOutcome {
    /// A cycle counts as successful once its price record is persisted
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Completed(_))
    }

    pub fn final_stage(&self) -> CycleStage {
        match self {
            CycleOutcome::Completed(_) => CycleStage::Done,
            _ => CycleStage::Failed,
        }
    }

    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            CycleOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Runs one fetch → submit → persist → analyze pass.
///
/// Stage outputs are handed to the next stage as values; nothing survives
/// between cycles except the collaborators themselves.
pub struct CycleOrchestrator {
    symbol: String,
    price_source: Arc<dyn PriceSource>,
    store: Arc<dyn RecordStore>,
    analytics: AnalyticsEngine,
    // None bypasses the ledger step
    submitter: Option<Arc<dyn PriceSubmitter>>,
    seal_timeout: Option<Duration>,
}

impl CycleOrchestrator {
    pub fn new(
        symbol: impl Into<String>,
        price_source: Arc<dyn PriceSource>,
        store: Arc<dyn RecordStore>,
        analytics: AnalyticsEngine,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price_source,
            store,
            analytics,
            submitter: None,
            seal_timeout: None,
        }
    }

    /// Commit each price to the ledger before persisting it. Without a
    /// submitter every record carries a `local_` reference.
    pub fn with_submitter(mut self, submitter: Arc<dyn PriceSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    pub fn chain_updates_enabled(&self) -> bool {
        self.submitter.is_some()
    }

    /// Give up waiting for a seal after `timeout`; reported as a cancellation
    pub fn with_seal_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.seal_timeout = timeout;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Run a full cycle. Never panics or returns early on a stage error;
    /// the outcome says how far it got.
    pub async fn run_cycle(&self, cycle: u64, cancel: &CancellationToken) -> CycleOutcome {
        // Fetching
        info!(cycle, stage = CycleStage::Fetching.as_str(), symbol = %self.symbol, "Fetching price");
        let price = match self.price_source.fetch_price(&self.symbol).await {
            Ok(price) => price,
            Err(e) => {
                error!(cycle, stage = CycleStage::Failed.as_str(), error = %e, "Error fetching price, aborting cycle");
                return CycleOutcome::FetchFailed { cycle, error: e };
            }
        };
        info!(cycle, symbol = %self.symbol, %price, "Fetched price");

        // ChainUpdate | ChainSkipped
        let (chain_reference, submit_error) = self.update_chain(cycle, price, cancel).await;

        // Persisting
        info!(
            cycle,
            stage = CycleStage::Persisting.as_str(),
            chain_reference = %chain_reference,
            "Saving price record"
        );
        let price_record = match self
            .store
            .insert_price_record(&self.symbol, price, &chain_reference)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                error!(cycle, stage = CycleStage::Failed.as_str(), error = %e, "Error saving price to database, skipping analytics");
                return CycleOutcome::PersistFailed {
                    cycle,
                    price,
                    chain_reference,
                    error: e,
                };
            }
        };

        // Analyzing
        info!(
            cycle,
            stage = CycleStage::Analyzing.as_str(),
            record_id = %price_record.id,
            "Computing protocol APYs"
        );
        let (snapshots, analytics_error) = match self.analytics.compute_snapshots(price) {
            Ok(candidates) => {
                let outcomes = self
                    .store
                    .insert_yield_snapshots(price_record.id, price, &candidates)
                    .await;
                (outcomes, None)
            }
            Err(e) => {
                error!(cycle, error = %e, "Error computing protocol APYs");
                (Vec::new(), Some(e))
            }
        };

        let report = CycleReport {
            cycle,
            price,
            chain_reference,
            submit_error,
            price_record,
            snapshots,
            analytics_error,
        };

        info!(
            cycle,
            stage = CycleStage::Done.as_str(),
            record_id = %report.price_record.id,
            snapshots_written = report.snapshots_written(),
            snapshots_failed = report.snapshots_failed(),
            "Cycle complete"
        );

        CycleOutcome::Completed(report)
    }

    async fn update_chain(
        &self,
        cycle: u64,
        price: Decimal,
        cancel: &CancellationToken,
    ) -> (ChainReference, Option<SubmitError>) {
        let submitter = match &self.submitter {
            Some(submitter) => submitter,
            None => {
                info!(cycle, stage = CycleStage::ChainSkipped.as_str(), "Skipping blockchain update (chain updates disabled)");
                return (ChainReference::bypassed(Utc::now()), None);
            }
        };

        info!(cycle, stage = CycleStage::ChainUpdate.as_str(), %price, "Updating price on chain");
        let result = match self.seal_timeout {
            Some(timeout) => {
                // Child token so the timeout ends this wait without stopping the scheduler
                let child = cancel.child_token();
                let submission = submitter.submit(price, &child);
                tokio::pin!(submission);
                tokio::select! {
                    result = &mut submission => result,
                    _ = tokio::time::sleep(timeout) => {
                        warn!(cycle, "No seal within {:?}, cancelling finality wait", timeout);
                        child.cancel();
                        submission.await
                    }
                }
            }
            None => submitter.submit(price, cancel).await,
        };

        match result {
            Ok(id) => (ChainReference::transaction(id.to_hex()), None),
            Err(e) => {
                let reference = ChainReference::degraded(e.kind.into(), Utc::now());
                warn!(
                    cycle,
                    kind = e.kind.as_str(),
                    error = %e,
                    chain_reference = %reference,
                    "Error updating price on-chain, continuing with database update only"
                );
                (reference, Some(e))
            }
        }
    }
}
