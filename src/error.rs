//! Error types for the ledger engine.

use crate::model::{GroupId, PaymentId};
use std::fmt;
use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur while splitting, recording or settling.
///
/// `Validation`, `InvalidInput` and `State` are the core error kinds; the
/// remaining variants belong to the service and CSV surfaces.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Split values don't add up to the expense amount, or percentages don't add up to 100
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed parameters: size mismatch, non-positive amount, duplicates, self-payment
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Ledger state is inconsistent (net positions don't sum to zero, poisoned lock)
    #[error("Inconsistent ledger state: {0}")]
    State(String),

    /// Group id has not been registered with the engine
    #[error("Unknown group {0}")]
    UnknownGroup(GroupId),

    /// Payment id is not part of the group's history
    #[error("Unknown payment {0}")]
    UnknownPayment(PaymentId),

    /// Failed to open or read the input file, or to write output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid event record
    #[error("Invalid event at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// Missing input file argument
    #[error("Missing input file argument. Usage: ledger-engine <events.csv> [plan|balances]")]
    MissingArgument,

    /// Unsupported report name on the command line
    #[error("Unknown report '{0}', expected 'plan' or 'balances'")]
    UnknownReport(String),
}

impl LedgerError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        LedgerError::InvalidInput(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    /// Prefixes the message of a core error with what it was about.
    pub(crate) fn context(self, subject: impl fmt::Display) -> Self {
        match self {
            LedgerError::Validation(m) => LedgerError::Validation(format!("{}: {}", subject, m)),
            LedgerError::InvalidInput(m) => LedgerError::InvalidInput(format!("{}: {}", subject, m)),
            LedgerError::State(m) => LedgerError::State(format!("{}: {}", subject, m)),
            other => other,
        }
    }
}
