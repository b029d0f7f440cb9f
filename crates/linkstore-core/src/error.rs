//! Error types for Linkstore Core

use crate::record::RecordKind;
use thiserror::Error;

/// Result type alias using Linkstore Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the record-chain layer
///
/// Structural damage found while deleting a property chain is repaired in
/// place and never shows up here; everything below is either a hard resource
/// failure or a caller breaking a contract.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An id sequence ran past its high limit
    #[error("Id space exhausted for {kind} records (limit {limit})")]
    IdExhausted {
        /// Record kind the sequence allocates for
        kind: RecordKind,
        /// Highest id the sequence may hand out
        limit: u64,
    },

    /// The reserved null reference was used where a record id is required
    #[error("Invalid {kind} id: {id}")]
    InvalidId {
        /// Record kind
        kind: RecordKind,
        /// Offending id
        id: u64,
    },

    /// A record required to be in use is not
    #[error("{kind} record {id} is not in use")]
    RecordNotInUse {
        /// Record kind
        kind: RecordKind,
        /// Record id
        id: u64,
    },

    /// A record was created twice within one change set
    #[error("{kind} record {id} is already staged in this transaction")]
    DuplicateRecord {
        /// Record kind
        kind: RecordKind,
        /// Record id
        id: u64,
    },

    /// A chain does not have the shape the operation relies on
    #[error("Inconsistent chain: {0}")]
    Inconsistent(String),

    /// Lock acquisition timed out
    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    /// Transaction lifecycle errors
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an inconsistent-chain error
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::Inconsistent(msg.into())
    }

    /// Create a transaction error
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a not-in-use error
    pub fn not_in_use(kind: RecordKind, id: u64) -> Self {
        Self::RecordNotInUse { kind, id }
    }
}
