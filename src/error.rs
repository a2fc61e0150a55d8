use crate::database::DatabaseError;
use sqlx::Error as SqlxError;
use std::fmt;
use thiserror::Error;

/// Application-level error types
///
/// Only bootstrap code returns these; steady-state cycle failures are
/// absorbed by the orchestrator and reported through logs.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ledger errors raised during startup checks
    #[error("Ledger error: {0}")]
    Ledger(#[from] SubmitError),

    /// Price feed construction errors
    #[error("Price feed error: {0}")]
    PriceFeed(#[from] PriceFetchError),

    /// The scheduler task stopped without being asked to
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Failure to obtain a usable price from the external feed.
///
/// Aborts the current cycle before any ledger or store side effect.
#[derive(Error, Debug)]
pub enum PriceFetchError {
    /// Connection, TLS or timeout failure
    #[error("request failed: {0}")]
    Transport(String),

    /// Feed answered with a non-2xx status
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not the expected JSON shape
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Price parsed but is not a valid observation
    #[error("invalid price {0}")]
    InvalidPrice(String),
}

impl PriceFetchError {
    /// Whether a bounded retry may help (transport, rate limiting, server errors)
    pub fn is_retryable(&self) -> bool {
        match self {
            PriceFetchError::Transport(_) => true,
            PriceFetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Classification of a failed ledger submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitErrorKind {
    /// Network/RPC failure while submitting or polling
    Transport,
    /// Transaction sealed but its execution failed
    ExecutionReverted,
    /// Finality wait cancelled by the caller
    Cancelled,
    /// Transaction expired before it could be sealed
    Expired,
    /// Price could not be encoded or the transaction could not be signed
    Encoding,
}

impl SubmitErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitErrorKind::Transport => "transport",
            SubmitErrorKind::ExecutionReverted => "execution_reverted",
            SubmitErrorKind::Cancelled => "cancelled",
            SubmitErrorKind::Expired => "expired",
            SubmitErrorKind::Encoding => "encoding",
        }
    }
}

impl fmt::Display for SubmitErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger submission failure. Always downgraded by the orchestrator, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {detail}")]
pub struct SubmitError {
    pub kind: SubmitErrorKind,
    pub detail: String,
}

impl SubmitError {
    pub fn new(kind: SubmitErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::new(SubmitErrorKind::Transport, detail)
    }

    pub fn reverted(detail: impl Into<String>) -> Self {
        Self::new(SubmitErrorKind::ExecutionReverted, detail)
    }

    pub fn cancelled() -> Self {
        Self::new(SubmitErrorKind::Cancelled, "finality wait cancelled")
    }

    pub fn expired(detail: impl Into<String>) -> Self {
        Self::new(SubmitErrorKind::Expired, detail)
    }

    pub fn encoding(detail: impl Into<String>) -> Self {
        Self::new(SubmitErrorKind::Encoding, detail)
    }
}

impl From<tonic::Status> for SubmitError {
    fn from(status: tonic::Status) -> Self {
        SubmitError::transport(format!("{:?}: {}", status.code(), status.message()))
    }
}

impl From<tonic::transport::Error> for SubmitError {
    fn from(err: tonic::transport::Error) -> Self {
        SubmitError::transport(err.to_string())
    }
}

/// Classification of a failed store write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Connectivity loss (pool timeout, I/O, closed pool)
    Unavailable,
    /// Schema-level rejection
    Constraint,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreErrorKind::Unavailable => f.write_str("unavailable"),
            StoreErrorKind::Constraint => f.write_str("constraint"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("store {kind}: {detail}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub detail: String,
}

impl StoreError {
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Unavailable,
            detail: detail.into(),
        }
    }

    pub fn constraint(detail: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Constraint,
            detail: detail.into(),
        }
    }
}

impl From<SqlxError> for StoreError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::Io(_)
            | SqlxError::Tls(_)
            | SqlxError::Protocol(_)
            | SqlxError::PoolTimedOut
            | SqlxError::PoolClosed
            | SqlxError::WorkerCrashed => StoreError::unavailable(err.to_string()),
            SqlxError::Database(db_err) => {
                // Keep the Postgres SQLSTATE (23503 = foreign key, 23505 = unique)
                let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
                StoreError::constraint(format!("[{}] {}", code, db_err.message()))
            }
            _ => StoreError::constraint(err.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
