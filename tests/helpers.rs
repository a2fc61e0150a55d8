#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use flow_oracle_updater::error::{PriceFetchError, StoreError, SubmitError};
use flow_oracle_updater::flow_client::{
    Account, AccountKey, FlowAddress, HashAlgorithm, LedgerAccess, SignatureAlgorithm,
    Transaction, TransactionId, TransactionResult, TransactionSigner, TransactionStatus,
};
use flow_oracle_updater::models::*;
use flow_oracle_updater::repositories::*;
use flow_oracle_updater::price_feed::PriceSource;
use flow_oracle_updater::services::{PriceSubmitter, Sleeper};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::{HashSet, VecDeque};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const TEST_PRIVATE_KEY: &str =
    "c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721";
pub const TEST_ACCOUNT: &str = "0xf8d6e0586b0a20c7";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn test_address() -> FlowAddress {
    TEST_ACCOUNT.parse().unwrap()
}

pub fn test_tx_id(byte: u8) -> TransactionId {
    TransactionId::from_slice(&[byte; 32]).unwrap()
}

/// P-256 / SHA3-256 signer and the matching account key at index 0
pub fn test_signer(sequence_number: u64) -> (TransactionSigner, AccountKey) {
    let signer = TransactionSigner::from_hex(
        TEST_PRIVATE_KEY,
        SignatureAlgorithm::EcdsaP256,
        HashAlgorithm::Sha3_256,
    )
    .unwrap();
    let key = AccountKey {
        index: 0,
        public_key: signer.public_key(),
        sign_algo: SignatureAlgorithm::EcdsaP256.code(),
        hash_algo: HashAlgorithm::Sha3_256.code(),
        sequence_number,
        revoked: false,
    };
    (signer, key)
}

pub fn result_with(status: TransactionStatus) -> TransactionResult {
    TransactionResult {
        status,
        status_code: 0,
        error_message: String::new(),
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// Access API fake: serves one account and a scripted sequence of results
pub struct ScriptedLedger {
    pub account: Account,
    pub tx_id: TransactionId,
    pub results: Mutex<VecDeque<Result<TransactionResult, SubmitError>>>,
    pub send_error: Option<SubmitError>,
    pub sent: Mutex<Vec<Transaction>>,
    pub polls: AtomicUsize,
}

impl ScriptedLedger {
    pub fn new(key: AccountKey) -> Self {
        Self {
            account: Account {
                address: test_address(),
                balance: 100_000_000,
                keys: vec![key],
            },
            tx_id: test_tx_id(0xab),
            results: Mutex::new(VecDeque::new()),
            send_error: None,
            sent: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
        }
    }

    /// Results handed out by successive polls. Once exhausted every poll
    /// reports `Pending`.
    pub fn with_results(self, results: Vec<Result<TransactionResult, SubmitError>>) -> Self {
        *self.results.lock().unwrap() = results.into();
        self
    }

    pub fn with_send_error(mut self, error: SubmitError) -> Self {
        self.send_error = Some(error);
        self
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerAccess for ScriptedLedger {
    async fn ping(&self) -> Result<(), SubmitError> {
        Ok(())
    }

    async fn get_account(&self, address: FlowAddress) -> Result<Account, SubmitError> {
        if address != self.account.address {
            return Err(SubmitError::transport(format!("account {} not found", address)));
        }
        Ok(self.account.clone())
    }

    async fn latest_sealed_block_id(&self) -> Result<Vec<u8>, SubmitError> {
        Ok(vec![0x11; 32])
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<TransactionId, SubmitError> {
        if let Some(error) = &self.send_error {
            return Err(error.clone());
        }
        self.sent.lock().unwrap().push(transaction.clone());
        Ok(self.tx_id)
    }

    async fn transaction_result(&self, _id: &TransactionId) -> Result<TransactionResult, SubmitError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(result_with(TransactionStatus::Pending)))
    }
}

/// Sleeper that returns immediately, optionally cancelling after N sleeps
#[derive(Default)]
pub struct InstantSleeper {
    pub sleeps: AtomicUsize,
    pub cancel_after: Option<(usize, CancellationToken)>,
}

impl InstantSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelling_after(sleeps: usize, token: CancellationToken) -> Self {
        Self {
            sleeps: AtomicUsize::new(0),
            cancel_after: Some((sleeps, token)),
        }
    }

    pub fn count(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, _duration: Duration) {
        let n = self.sleeps.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((limit, token)) = &self.cancel_after {
            if n >= *limit {
                token.cancel();
            }
        }
        tokio::task::yield_now().await;
    }
}

/// Submitter fake with a fixed answer and an optional delay
pub struct FakeSubmitter {
    pub result: Result<TransactionId, SubmitError>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeSubmitter {
    pub fn sealed(id: TransactionId) -> Self {
        Self {
            result: Ok(id),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: SubmitError) -> Self {
        Self {
            result: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSubmitter for FakeSubmitter {
    async fn submit(
        &self,
        _price: Decimal,
        cancel: &CancellationToken,
    ) -> Result<TransactionId, SubmitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(SubmitError::cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        self.result.clone()
    }
}

// =============================================================================
// PRICE SOURCE
// =============================================================================

/// Price source that replays scripted answers, then repeats `fallback`
pub struct ScriptedPriceSource {
    pub answers: Mutex<VecDeque<Result<Decimal, PriceFetchError>>>,
    pub fallback: Decimal,
    pub fetched_at: Mutex<Vec<Instant>>,
}

impl ScriptedPriceSource {
    pub fn fixed(price: Decimal) -> Self {
        Self::scripted(Vec::new(), price)
    }

    pub fn scripted(answers: Vec<Result<Decimal, PriceFetchError>>, fallback: Decimal) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            fallback,
            fetched_at: Mutex::new(Vec::new()),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched_at.lock().unwrap().len()
    }

    pub fn fetch_times(&self) -> Vec<Instant> {
        self.fetched_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for ScriptedPriceSource {
    async fn fetch_price(&self, _symbol: &str) -> Result<Decimal, PriceFetchError> {
        self.fetched_at.lock().unwrap().push(Instant::now());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(self.fallback))
    }
}

// =============================================================================
// STORE
// =============================================================================

/// In-memory store with the same foreign key rule as the real schema
#[derive(Default)]
pub struct InMemoryRecordStore {
    pub prices: Mutex<Vec<PriceRecord>>,
    pub snapshots: Mutex<Vec<YieldSnapshot>>,
    pub fail_prices: Option<StoreError>,
    pub failing_protocols: HashSet<String>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_prices(error: StoreError) -> Self {
        Self {
            fail_prices: Some(error),
            ..Self::default()
        }
    }

    pub fn failing_protocol(mut self, name: &str) -> Self {
        self.failing_protocols.insert(name.to_string());
        self
    }

    pub fn price_rows(&self) -> Vec<PriceRecord> {
        self.prices.lock().unwrap().clone()
    }

    pub fn snapshot_rows(&self) -> Vec<YieldSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_price_record(
        &self,
        symbol: &str,
        price_usd: Decimal,
        chain_reference: &ChainReference,
    ) -> Result<PriceRecord, StoreError> {
        if let Some(error) = &self.fail_prices {
            return Err(error.clone());
        }
        let record = PriceRecord::new(symbol, price_usd, chain_reference, Utc::now());
        self.prices.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn insert_yield_snapshots(
        &self,
        price_record_id: Uuid,
        reference_price: Decimal,
        candidates: &[SnapshotCandidate],
    ) -> Vec<SnapshotOutcome> {
        let anchored = self
            .prices
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.id == price_record_id);

        candidates
            .iter()
            .map(|candidate| {
                let result = if !anchored {
                    Err(StoreError::constraint("[23503] price_oracle_id not found"))
                } else if self.failing_protocols.contains(&candidate.protocol_name) {
                    Err(StoreError::unavailable("connection reset"))
                } else {
                    let row = YieldSnapshot::from_candidate(
                        candidate,
                        reference_price,
                        price_record_id,
                        Utc::now(),
                    );
                    let id = row.id;
                    self.snapshots.lock().unwrap().push(row);
                    Ok(id)
                };
                SnapshotOutcome {
                    protocol_name: candidate.protocol_name.clone(),
                    apy: candidate.apy,
                    result,
                }
            })
            .collect()
    }
}

/// Postgres-backed store plus its repositories, for `#[sqlx::test]`
pub struct TestDatabase {
    pub pool: PgPool,
    pub store: Arc<PgRecordStore>,
}

impl TestDatabase {
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            store: Arc::new(PgRecordStore::new(pool.clone())),
            pool,
        }
    }
}
