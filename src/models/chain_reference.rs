use crate::error::SubmitErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why a cycle could not attach a real transaction id to its price record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegradedReason {
    /// Transport failure or a transaction that could not be built
    Skipped,
    /// Sealed, but execution failed on chain
    Reverted,
    /// Finality wait cancelled (shutdown or seal timeout)
    Cancelled,
    /// Never sealed before its reference block expired
    Expired,
}

impl DegradedReason {
    /// Convert to the stored prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradedReason::Skipped => "skipped",
            DegradedReason::Reverted => "reverted",
            DegradedReason::Cancelled => "cancelled",
            DegradedReason::Expired => "expired",
        }
    }

    /// Convert from the stored prefix
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "skipped" => Ok(DegradedReason::Skipped),
            "reverted" => Ok(DegradedReason::Reverted),
            "cancelled" => Ok(DegradedReason::Cancelled),
            "expired" => Ok(DegradedReason::Expired),
            _ => Err(format!("Invalid degraded reason: {}", s)),
        }
    }
}

impl From<SubmitErrorKind> for DegradedReason {
    fn from(kind: SubmitErrorKind) -> Self {
        match kind {
            SubmitErrorKind::Transport | SubmitErrorKind::Encoding => DegradedReason::Skipped,
            SubmitErrorKind::ExecutionReverted => DegradedReason::Reverted,
            SubmitErrorKind::Cancelled => DegradedReason::Cancelled,
            SubmitErrorKind::Expired => DegradedReason::Expired,
        }
    }
}

/// What a price record points at on the ledger.
///
/// Stored as TEXT in `price_oracle.tx_hash`: a 64-char hex transaction id,
/// `<reason>_<unix>` for a degraded update or `local_<unix>` when chain
/// updates are switched off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainReference {
    Transaction(String),
    Degraded { reason: DegradedReason, at: i64 },
    Bypassed { at: i64 },
}

const BYPASSED_PREFIX: &str = "local";

impl ChainReference {
    pub fn transaction(id: impl Into<String>) -> Self {
        ChainReference::Transaction(id.into())
    }

    pub fn degraded(reason: DegradedReason, at: chrono::DateTime<chrono::Utc>) -> Self {
        ChainReference::Degraded {
            reason,
            at: at.timestamp(),
        }
    }

    pub fn bypassed(at: chrono::DateTime<chrono::Utc>) -> Self {
        ChainReference::Bypassed { at: at.timestamp() }
    }

    /// True only for a genuine ledger transaction id
    pub fn is_transaction(&self) -> bool {
        matches!(self, ChainReference::Transaction(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ChainReference::Degraded { .. })
    }

    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            ChainReference::Transaction(id) => Some(id),
            _ => None,
        }
    }

    /// Convert to database string
    pub fn to_db_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChainReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainReference::Transaction(id) => f.write_str(id),
            ChainReference::Degraded { reason, at } => write!(f, "{}_{}", reason.as_str(), at),
            ChainReference::Bypassed { at } => write!(f, "{}_{}", BYPASSED_PREFIX, at),
        }
    }
}

fn is_transaction_id(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

impl FromStr for ChainReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_transaction_id(s) {
            return Ok(ChainReference::Transaction(s.to_ascii_lowercase()));
        }

        let (prefix, ts) = s
            .rsplit_once('_')
            .ok_or_else(|| format!("Invalid chain reference: {}", s))?;
        let at = ts
            .parse::<i64>()
            .map_err(|_| format!("Invalid chain reference timestamp: {}", s))?;

        if prefix == BYPASSED_PREFIX {
            Ok(ChainReference::Bypassed { at })
        } else {
            Ok(ChainReference::Degraded {
                reason: DegradedReason::from_str(prefix)?,
                at,
            })
        }
    }
}
