//! The module contains the errors the ledger can return.
//!
//! Integrity errors ([`UnknownMember`], [`AmbiguousCreditor`],
//! [`DuplicateMember`], [`InvalidOwner`]) mean the server sent a payload
//! the ledger refuses to model. Transition errors ([`TerminalState`],
//! [`ReversalRequired`]) come from the settlement state machine.
//!
//!  [`UnknownMember`]: LedgerError::UnknownMember
//!  [`AmbiguousCreditor`]: LedgerError::AmbiguousCreditor
//!  [`DuplicateMember`]: LedgerError::DuplicateMember
//!  [`InvalidOwner`]: LedgerError::InvalidOwner
//!  [`TerminalState`]: LedgerError::TerminalState
//!  [`ReversalRequired`]: LedgerError::ReversalRequired
use thiserror::Error;

/// Ledger custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Unknown member: {0}")]
    UnknownMember(String),
    #[error("Ambiguous creditor: {0}")]
    AmbiguousCreditor(String),
    #[error("\"{0}\" already present!")]
    DuplicateMember(String),
    #[error("Invalid owner: {0}")]
    InvalidOwner(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),
    #[error("Payment confirmation {0} is already deleted")]
    TerminalState(i64),
    #[error("Payment confirmation {0} is confirmed and needs an explicit reversal")]
    ReversalRequired(i64),
    #[error("Amount overflow")]
    Overflow,
}
