use crate::error::SubmitError;
use crate::flow_client::ufix64::{encode_ufix64, format_ufix64, ufix64_argument};
use crate::flow_client::{
    FlowAddress, LedgerAccess, ProposalKey, Transaction, TransactionId, TransactionResult,
    TransactionSigner, TransactionStatus,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Delay between finality polls, injectable so tests need no wall clock
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Commits a price to the ledger and waits for it to be final
#[async_trait]
pub trait PriceSubmitter: Send + Sync {
    async fn submit(
        &self,
        price: Decimal,
        cancel: &CancellationToken,
    ) -> Result<TransactionId, SubmitError>;
}

/// Builds, signs and submits `PriceOracle` update transactions, then polls
/// until the transaction is sealed.
///
/// One call submits exactly one transaction; there is no retry here.
pub struct LedgerSubmitter {
    access: Arc<dyn LedgerAccess>,
    signer: TransactionSigner,
    account: FlowAddress,
    key_index: u32,
    contract: FlowAddress,
    gas_limit: u64,
    poll_interval: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl LedgerSubmitter {
    /// Create a new submitter
    ///
    /// # Arguments
    /// * `access` - Access API client
    /// * `signer` - Signer for `account`'s key at `key_index`
    /// * `account` - Proposer, payer and sole authorizer
    /// * `key_index` - Account key used for proposal and envelope signature
    /// * `contract` - Address the `PriceOracle` contract is deployed to
    pub fn new(
        access: Arc<dyn LedgerAccess>,
        signer: TransactionSigner,
        account: FlowAddress,
        key_index: u32,
        contract: FlowAddress,
    ) -> Self {
        Self {
            access,
            signer,
            account,
            key_index,
            contract,
            gas_limit: 100,
            poll_interval: Duration::from_secs(1),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Set gas limit
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Set finality poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Cadence transaction borrowing the oracle admin resource from the signer
    pub fn update_script(&self) -> String {
        format!(
            r#"
import PriceOracle from {}

transaction(newPrice: UFix64) {{
    prepare(signer: auth(Storage) &Account) {{
        let admin = signer.storage.borrow<&PriceOracle.Admin>(
            from: PriceOracle.AdminStoragePath
        ) ?? panic("Could not borrow admin resource")

        admin.updateFlowPrice(newPrice: newPrice)
    }}
}}
"#,
            self.contract
        )
    }

    /// Build and sign the update transaction for `price` against the
    /// current sequence number and latest sealed block.
    pub async fn build_transaction(&self, price: Decimal) -> Result<Transaction, SubmitError> {
        let raw = encode_ufix64(price).map_err(SubmitError::encoding)?;

        let account = self.access.get_account(self.account).await?;
        let key = account.key(self.key_index).ok_or_else(|| {
            SubmitError::encoding(format!(
                "Account {} has no key at index {}",
                self.account, self.key_index
            ))
        })?;
        if key.revoked {
            return Err(SubmitError::encoding(format!(
                "Account key {} of {} is revoked",
                self.key_index, self.account
            )));
        }

        let reference_block_id = self.access.latest_sealed_block_id().await?;

        let mut transaction = Transaction::single_signer(
            self.update_script(),
            vec![ufix64_argument(raw)],
            reference_block_id,
            self.gas_limit,
            ProposalKey {
                address: self.account,
                key_index: self.key_index,
                sequence_number: key.sequence_number,
            },
        );

        transaction
            .sign_envelope(self.account, self.key_index, &self.signer)
            .map_err(SubmitError::encoding)?;

        debug!(
            price = %format_ufix64(raw),
            sequence_number = key.sequence_number,
            "Built price update transaction"
        );

        Ok(transaction)
    }

    /// Poll until `id` is sealed. Unbounded unless `cancel` fires.
    pub async fn wait_for_seal(
        &self,
        id: &TransactionId,
        cancel: &CancellationToken,
    ) -> Result<TransactionResult, SubmitError> {
        let mut polls: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(SubmitError::cancelled());
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SubmitError::cancelled()),
                result = self.access.transaction_result(id) => result?,
            };
            polls += 1;

            match result.status {
                TransactionStatus::Sealed => {
                    debug!(tx_id = %id, polls, "Transaction sealed");
                    return Ok(result);
                }
                TransactionStatus::Expired => {
                    return Err(SubmitError::expired(format!(
                        "transaction {} expired after {} polls",
                        id, polls
                    )));
                }
                status => {
                    debug!(tx_id = %id, status = status.as_str(), polls, "Waiting for seal");
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SubmitError::cancelled()),
                _ = self.sleeper.sleep(self.poll_interval) => {}
            }
        }
    }
}

#[async_trait]
impl PriceSubmitter for LedgerSubmitter {
    async fn submit(
        &self,
        price: Decimal,
        cancel: &CancellationToken,
    ) -> Result<TransactionId, SubmitError> {
        // Nothing may reach the ledger once shutdown or the seal timeout has fired
        if cancel.is_cancelled() {
            return Err(SubmitError::cancelled());
        }

        let transaction = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SubmitError::cancelled()),
            built = self.build_transaction(price) => built?,
        };
        let id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SubmitError::cancelled()),
            sent = self.access.send_transaction(&transaction) => sent?,
        };
        info!(tx_id = %id, %price, "Price update transaction submitted");

        let result = self.wait_for_seal(&id, cancel).await?;
        if let Some(error) = result.execution_error() {
            warn!(tx_id = %id, error, "Price update sealed with execution error");
            return Err(SubmitError::reverted(format!("transaction {}: {}", id, error)));
        }

        info!(tx_id = %id, %price, "Price updated on chain");
        Ok(id)
    }
}
