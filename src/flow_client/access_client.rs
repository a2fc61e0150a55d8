use super::proto::access_api_client::AccessApiClient;
use super::proto::{
    self, GetAccountAtLatestBlockRequest, GetLatestBlockHeaderRequest, GetTransactionRequest,
    PingRequest, SendTransactionRequest,
};
use super::types::{Account, AccountKey, FlowAddress, TransactionId, TransactionResult, TransactionStatus};
use super::{LedgerAccess, Transaction};
use crate::error::SubmitError;
use async_trait::async_trait;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

/// gRPC client for a Flow access node
#[derive(Clone)]
pub struct FlowAccessClient {
    client: AccessApiClient<Channel>,
    endpoint: String,
}

impl FlowAccessClient {
    /// Connect to an access node, e.g. `access.testnet.nodes.onflow.org:9000`.
    /// Plain `host:port` endpoints are dialed without TLS.
    pub async fn connect(endpoint: &str) -> Result<Self, SubmitError> {
        let uri = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("http://{}", endpoint)
        };

        let channel = Endpoint::from_shared(uri)
            .map_err(|e| SubmitError::transport(format!("Invalid access node {}: {}", endpoint, e)))?
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .connect()
            .await?;

        debug!(endpoint, "Connected to Flow access node");

        Ok(Self {
            client: AccessApiClient::new(channel),
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn status_from_proto(status: proto::TransactionStatus) -> TransactionStatus {
    match status {
        proto::TransactionStatus::Unknown => TransactionStatus::Unknown,
        proto::TransactionStatus::Pending => TransactionStatus::Pending,
        proto::TransactionStatus::Finalized => TransactionStatus::Finalized,
        proto::TransactionStatus::Executed => TransactionStatus::Executed,
        proto::TransactionStatus::Sealed => TransactionStatus::Sealed,
        proto::TransactionStatus::Expired => TransactionStatus::Expired,
    }
}

fn account_from_proto(account: proto::Account) -> Result<Account, SubmitError> {
    let address = FlowAddress::from_bytes(&account.address).map_err(SubmitError::transport)?;
    let keys = account
        .keys
        .into_iter()
        .map(|k| AccountKey {
            index: k.index,
            public_key: k.public_key,
            sign_algo: k.sign_algo,
            hash_algo: k.hash_algo,
            sequence_number: k.sequence_number as u64,
            revoked: k.revoked,
        })
        .collect();

    Ok(Account {
        address,
        balance: account.balance,
        keys,
    })
}

#[async_trait]
impl LedgerAccess for FlowAccessClient {
    async fn ping(&self) -> Result<(), SubmitError> {
        let mut client = self.client.clone();
        client.ping(PingRequest {}).await?;
        Ok(())
    }

    async fn get_account(&self, address: FlowAddress) -> Result<Account, SubmitError> {
        let mut client = self.client.clone();
        let response = client
            .get_account_at_latest_block(GetAccountAtLatestBlockRequest {
                address: address.as_bytes().to_vec(),
            })
            .await?
            .into_inner();

        let account = response
            .account
            .ok_or_else(|| SubmitError::transport(format!("Access node returned no account for {}", address)))?;
        account_from_proto(account)
    }

    async fn latest_sealed_block_id(&self) -> Result<Vec<u8>, SubmitError> {
        let mut client = self.client.clone();
        let response = client
            .get_latest_block_header(GetLatestBlockHeaderRequest { is_sealed: true })
            .await?
            .into_inner();

        response
            .block
            .map(|b| b.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SubmitError::transport("Access node returned no block header"))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<TransactionId, SubmitError> {
        let mut client = self.client.clone();
        let response = client
            .send_transaction(SendTransactionRequest {
                transaction: Some(transaction.to_proto()),
            })
            .await?
            .into_inner();

        TransactionId::from_slice(&response.id).map_err(SubmitError::transport)
    }

    async fn transaction_result(&self, id: &TransactionId) -> Result<TransactionResult, SubmitError> {
        let mut client = self.client.clone();
        let response = client
            .get_transaction_result(GetTransactionRequest {
                id: id.as_bytes().to_vec(),
            })
            .await?
            .into_inner();

        Ok(TransactionResult {
            status: status_from_proto(response.status()),
            status_code: response.status_code,
            error_message: response.error_message,
        })
    }
}
