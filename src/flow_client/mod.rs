//! Flow client for on-chain interactions
//!
//! Wraps the Flow Access API (gRPC) behind [`LedgerAccess`] and provides
//! the transaction encoding and signing the price updater needs.

pub mod access_client;
pub mod rlp;
pub mod signer;
pub mod transaction;
pub mod types;
pub mod ufix64;

// Include the generated proto code
pub mod proto {
    tonic::include_proto!("flow.access");
}

pub use access_client::FlowAccessClient;
pub use signer::{HashAlgorithm, SignatureAlgorithm, TransactionSigner};
pub use transaction::{ProposalKey, Transaction, TransactionSignature};
pub use types::{Account, AccountKey, FlowAddress, TransactionId, TransactionResult, TransactionStatus};

use crate::error::SubmitError;
use async_trait::async_trait;

/// The subset of the Access API the updater depends on.
///
/// Every failure is a [`SubmitError`] of kind `Transport`.
#[async_trait]
pub trait LedgerAccess: Send + Sync {
    async fn ping(&self) -> Result<(), SubmitError>;

    async fn get_account(&self, address: FlowAddress) -> Result<Account, SubmitError>;

    /// Id of the latest sealed block, used as the transaction reference block
    async fn latest_sealed_block_id(&self) -> Result<Vec<u8>, SubmitError>;

    async fn send_transaction(&self, transaction: &Transaction) -> Result<TransactionId, SubmitError>;

    async fn transaction_result(&self, id: &TransactionId) -> Result<TransactionResult, SubmitError>;
}
