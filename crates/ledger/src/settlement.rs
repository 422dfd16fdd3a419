//! Payment confirmation lifecycle.
//!
//! ```text
//! Requested ──confirm──▶ Confirmed
//!     │
//!     └──────delete────▶ Deleted
//! ```
//!
//! `Confirmed` and `Deleted` are terminal. Confirming a confirmed record
//! is a no-op, deleting a confirmed record is refused with
//! [`LedgerError::ReversalRequired`].
//!
//! The state machine never mutates optimistically: [`PaymentConfirmation::plan`]
//! decides whether a request must reach the server, and
//! [`PaymentConfirmation::apply`] commits the new state only once the server
//! acknowledged it.

use chrono::{DateTime, FixedOffset};

use crate::{LedgerError, Money, RegisteredSplit};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationState {
    Requested,
    Confirmed {
        confirmed_at: Option<DateTime<FixedOffset>>,
    },
    Deleted,
}

impl ConfirmationState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ConfirmationState::Requested)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Confirm,
    Delete,
}

/// What a transition requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionPlan {
    /// The transition must be sent to the server.
    Submit,
    /// The record is already in the target state.
    NoOp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub id: i64,
    /// Debtor share this payment settles.
    pub user_expense_id: i64,
    pub amount: Money,
    pub confirmation_date: DateTime<FixedOffset>,
    pub state: ConfirmationState,
}

impl PaymentConfirmation {
    /// A freshly requested confirmation. `amount` must be > 0.
    pub fn requested(
        id: i64,
        user_expense_id: i64,
        amount: Money,
        confirmation_date: DateTime<FixedOffset>,
    ) -> Result<Self, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "payment confirmation amount must be positive, got {amount}"
            )));
        }
        Ok(Self {
            id,
            user_expense_id,
            amount,
            confirmation_date,
            state: ConfirmationState::Requested,
        })
    }

    /// Rebuilds a record from the server's `is_confirmed` flag.
    pub fn from_server(
        id: i64,
        user_expense_id: i64,
        amount: Money,
        confirmation_date: DateTime<FixedOffset>,
        is_confirmed: bool,
        confirmed_at: Option<DateTime<FixedOffset>>,
    ) -> Result<Self, LedgerError> {
        let mut confirmation = Self::requested(id, user_expense_id, amount, confirmation_date)?;
        if is_confirmed {
            confirmation.state = ConfirmationState::Confirmed { confirmed_at };
        }
        Ok(confirmation)
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.state, ConfirmationState::Confirmed { .. })
    }

    pub fn plan(&self, transition: Transition) -> Result<TransitionPlan, LedgerError> {
        match (self.state, transition) {
            (ConfirmationState::Requested, _) => Ok(TransitionPlan::Submit),
            (ConfirmationState::Confirmed { .. }, Transition::Confirm) => Ok(TransitionPlan::NoOp),
            (ConfirmationState::Confirmed { .. }, Transition::Delete) => {
                Err(LedgerError::ReversalRequired(self.id))
            }
            (ConfirmationState::Deleted, _) => Err(LedgerError::TerminalState(self.id)),
        }
    }

    /// Commits an acknowledged transition.
    ///
    /// `at` stamps `confirmed_at` when confirming.
    pub fn apply(
        mut self,
        transition: Transition,
        at: DateTime<FixedOffset>,
    ) -> Result<Self, LedgerError> {
        if self.plan(transition)? == TransitionPlan::NoOp {
            return Ok(self);
        }
        self.state = match transition {
            Transition::Confirm => ConfirmationState::Confirmed {
                confirmed_at: Some(at),
            },
            Transition::Delete => ConfirmationState::Deleted,
        };
        Ok(self)
    }
}

/// Part of `share` not yet covered by confirmed payments. Never negative.
///
/// Requested (unconfirmed) payments do not reduce the outstanding amount.
pub fn outstanding(
    share: &RegisteredSplit,
    confirmations: &[PaymentConfirmation],
) -> Result<Money, LedgerError> {
    let paid = Money::try_sum(
        confirmations
            .iter()
            .filter(|c| c.user_expense_id == share.id && c.is_confirmed())
            .map(|c| c.amount),
    )?;
    if paid >= share.amount {
        return Ok(Money::ZERO);
    }
    share.amount.checked_sub(paid).ok_or(LedgerError::Overflow)
}
