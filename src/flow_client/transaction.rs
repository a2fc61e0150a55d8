//! Flow transaction body, canonical encoding and envelope signing.

use super::proto;
use super::rlp::Item;
use super::signer::TransactionSigner;
use super::types::FlowAddress;

/// Domain separation tag prepended to every transaction signing message
const TRANSACTION_DOMAIN_TAG: &[u8] = b"FLOW-V0.0-transaction";

fn padded_domain_tag() -> [u8; 32] {
    let mut tag = [0u8; 32];
    tag[..TRANSACTION_DOMAIN_TAG.len()].copy_from_slice(TRANSACTION_DOMAIN_TAG);
    tag
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalKey {
    pub address: FlowAddress,
    pub key_index: u32,
    pub sequence_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSignature {
    pub address: FlowAddress,
    pub key_index: u32,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub script: Vec<u8>,
    pub arguments: Vec<Vec<u8>>,
    pub reference_block_id: Vec<u8>,
    pub gas_limit: u64,
    pub proposal_key: ProposalKey,
    pub payer: FlowAddress,
    pub authorizers: Vec<FlowAddress>,
    pub payload_signatures: Vec<TransactionSignature>,
    pub envelope_signatures: Vec<TransactionSignature>,
}

impl Transaction {
    /// Transaction where one account proposes, pays and authorizes
    pub fn single_signer(
        script: impl Into<Vec<u8>>,
        arguments: Vec<Vec<u8>>,
        reference_block_id: Vec<u8>,
        gas_limit: u64,
        proposal_key: ProposalKey,
    ) -> Self {
        let account = proposal_key.address;
        Self {
            script: script.into(),
            arguments,
            reference_block_id,
            gas_limit,
            proposal_key,
            payer: account,
            authorizers: vec![account],
            payload_signatures: Vec::new(),
            envelope_signatures: Vec::new(),
        }
    }

    /// Distinct signing accounts in canonical order: proposer, payer, authorizers
    fn signer_list(&self) -> Vec<FlowAddress> {
        let mut signers: Vec<FlowAddress> = Vec::new();
        let candidates = std::iter::once(self.proposal_key.address)
            .chain(std::iter::once(self.payer))
            .chain(self.authorizers.iter().copied());
        for address in candidates {
            if !signers.contains(&address) {
                signers.push(address);
            }
        }
        signers
    }

    fn payload_item(&self) -> Item {
        Item::list(vec![
            Item::bytes(&self.script),
            Item::list(self.arguments.iter().map(Item::bytes).collect()),
            Item::bytes(&self.reference_block_id),
            Item::uint(self.gas_limit),
            Item::bytes(self.proposal_key.address.as_bytes()),
            Item::uint(self.proposal_key.key_index as u64),
            Item::uint(self.proposal_key.sequence_number),
            Item::bytes(self.payer.as_bytes()),
            Item::list(
                self.authorizers
                    .iter()
                    .map(|a| Item::bytes(a.as_bytes()))
                    .collect(),
            ),
        ])
    }

    fn signatures_item(&self, signatures: &[TransactionSignature]) -> Result<Item, String> {
        let signers = self.signer_list();
        let mut items = Vec::with_capacity(signatures.len());
        for sig in signatures {
            let signer_index = signers
                .iter()
                .position(|a| *a == sig.address)
                .ok_or_else(|| format!("{} is not a signer of this transaction", sig.address))?;
            items.push(Item::list(vec![
                Item::uint(signer_index as u64),
                Item::uint(sig.key_index as u64),
                Item::bytes(&sig.signature),
            ]));
        }
        Ok(Item::list(items))
    }

    /// Bytes the payer signs: domain tag followed by RLP(payload, payload signatures)
    pub fn envelope_message(&self) -> Result<Vec<u8>, String> {
        let envelope = Item::list(vec![
            self.payload_item(),
            self.signatures_item(&self.payload_signatures)?,
        ]);
        let mut message = padded_domain_tag().to_vec();
        message.extend_from_slice(&envelope.encode());
        Ok(message)
    }

    /// Sign the envelope as `address`/`key_index` and attach the signature
    pub fn sign_envelope(
        &mut self,
        address: FlowAddress,
        key_index: u32,
        signer: &TransactionSigner,
    ) -> Result<(), String> {
        if !self.signer_list().contains(&address) {
            return Err(format!("{} is not a signer of this transaction", address));
        }
        let signature = signer.sign(&self.envelope_message()?)?;
        self.envelope_signatures.push(TransactionSignature {
            address,
            key_index,
            signature,
        });
        Ok(())
    }

    pub fn to_proto(&self) -> proto::Transaction {
        let to_sig = |s: &TransactionSignature| proto::transaction::Signature {
            address: s.address.as_bytes().to_vec(),
            key_id: s.key_index,
            signature: s.signature.clone(),
        };
        proto::Transaction {
            script: self.script.clone(),
            arguments: self.arguments.clone(),
            reference_block_id: self.reference_block_id.clone(),
            gas_limit: self.gas_limit,
            proposal_key: Some(proto::transaction::ProposalKey {
                address: self.proposal_key.address.as_bytes().to_vec(),
                key_id: self.proposal_key.key_index,
                sequence_number: self.proposal_key.sequence_number,
            }),
            payer: self.payer.as_bytes().to_vec(),
            authorizers: self.authorizers.iter().map(|a| a.as_bytes().to_vec()).collect(),
            payload_signatures: self.payload_signatures.iter().map(to_sig).collect(),
            envelope_signatures: self.envelope_signatures.iter().map(to_sig).collect(),
        }
    }
}
