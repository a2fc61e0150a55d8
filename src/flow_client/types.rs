use std::fmt;
use std::str::FromStr;

/// 8-byte Flow account address
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowAddress([u8; 8]);

impl FlowAddress {
    pub const LEN: usize = 8;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() > Self::LEN {
            return Err(format!("Address too long: {} bytes", bytes.len()));
        }
        // Left-pad short addresses the way Flow tooling does
        let mut out = [0u8; 8];
        out[Self::LEN - bytes.len()..].copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for FlowAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if hex_part.is_empty() {
            return Err("Address is empty".to_string());
        }
        let padded = if hex_part.len() % 2 == 1 {
            format!("0{}", hex_part)
        } else {
            hex_part.to_string()
        };
        let bytes = hex::decode(&padded).map_err(|e| format!("Invalid address {}: {}", s, e))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for FlowAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for FlowAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlowAddress({})", self)
    }
}

/// 32-byte transaction identifier, rendered as lowercase hex
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId([u8; 32]);

impl TransactionId {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| format!("Transaction id must be 32 bytes, got {}", bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for TransactionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|e| format!("Invalid transaction id: {}", e))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self)
    }
}

/// Lifecycle status reported by the Access API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Unknown,
    Pending,
    Finalized,
    Executed,
    Sealed,
    Expired,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Unknown => "unknown",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Finalized => "finalized",
            TransactionStatus::Executed => "executed",
            TransactionStatus::Sealed => "sealed",
            TransactionStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResult {
    pub status: TransactionStatus,
    pub status_code: u32,
    pub error_message: String,
}

impl TransactionResult {
    pub fn is_sealed(&self) -> bool {
        self.status == TransactionStatus::Sealed
    }

    /// Execution error of a sealed transaction, if any
    pub fn execution_error(&self) -> Option<&str> {
        if self.error_message.is_empty() && self.status_code == 0 {
            None
        } else if self.error_message.is_empty() {
            Some("execution failed without an error message")
        } else {
            Some(&self.error_message)
        }
    }
}

/// Public key registered on an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKey {
    pub index: u32,
    pub public_key: Vec<u8>,
    pub sign_algo: u32,
    pub hash_algo: u32,
    pub sequence_number: u64,
    pub revoked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: FlowAddress,
    pub balance: u64,
    pub keys: Vec<AccountKey>,
}

impl Account {
    pub fn key(&self, index: u32) -> Option<&AccountKey> {
        self.keys.iter().find(|k| k.index == index)
    }
}
