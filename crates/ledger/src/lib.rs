//! Expense ledger and settlement rules for shared groups.
//!
//! The crate is pure: it models the server's view of a group
//! ([`Group`], [`Expense`], members), derives per-member balances from it
//! and encodes the payment confirmation lifecycle. Fetching and
//! synchronizing that state is the job of the `client` crate.

pub use balance::{Balance, compute_balance, expense_contribution};
pub use currency::Currency;
pub use error::LedgerError;
pub use expense::{Creditor, Expense, ExternalSplit, RegisteredSplit};
pub use group::{Group, GroupBuilder};
pub use member::{ExternalMember, Member, MemberKey, RegisteredMember};
pub use money::Money;
pub use settlement::{
    ConfirmationState, PaymentConfirmation, Transition, TransitionPlan, outstanding,
};

pub mod balance;
mod currency;
mod error;
mod expense;
mod group;
mod member;
mod money;
pub mod settlement;

type ResultLedger<T> = Result<T, LedgerError>;
