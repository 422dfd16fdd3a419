use chrono::Utc;
use ledger::{LedgerError, Money, PaymentConfirmation, Transition, TransitionPlan};
use uuid::Uuid;

use crate::{DomainError, Repository, error::Result};

/// Drives payment confirmations through their lifecycle.
///
/// Every transition is checked against the ledger state machine first and
/// then performed as a single round trip. Nothing is changed locally
/// before the server acknowledges it; callers re-fetch the confirmation
/// list to observe the new state.
#[derive(Clone)]
pub struct Settlements {
    repository: Repository,
}

impl Settlements {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Requests confirmation of a payment against a debtor share.
    ///
    /// The caller is responsible for `amount` not exceeding the outstanding
    /// share (see [`ledger::outstanding`]); only positivity is checked here.
    pub async fn request_payment_confirmation(
        &self,
        user_expense_id: i64,
        amount: Money,
    ) -> Result<PaymentConfirmation> {
        self.request_payment_confirmation_with_key(user_expense_id, amount, Uuid::new_v4())
            .await
    }

    /// Same as [`Settlements::request_payment_confirmation`] with an
    /// explicit idempotency key, for retrying after a connection error.
    pub async fn request_payment_confirmation_with_key(
        &self,
        user_expense_id: i64,
        amount: Money,
        idempotency_key: Uuid,
    ) -> Result<PaymentConfirmation> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "payment confirmation amount must be positive, got {amount}"
            ))
            .into());
        }

        let confirmation = self
            .repository
            .request_payment_confirmation(user_expense_id, amount, idempotency_key)
            .await?;
        tracing::info!(
            "payment confirmation {} requested for share {user_expense_id}",
            confirmation.id
        );
        Ok(confirmation)
    }

    /// Confirms a requested payment. Confirming an already confirmed
    /// record succeeds without contacting the server.
    pub async fn confirm_payment(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<PaymentConfirmation> {
        if confirmation.plan(Transition::Confirm)? == TransitionPlan::NoOp {
            tracing::debug!("payment confirmation {} already confirmed", confirmation.id);
            return Ok(confirmation.clone());
        }

        let acknowledged = self
            .repository
            .confirm_payment_confirmation(confirmation.id)
            .await?;
        if !acknowledged.is_confirmed() {
            tracing::error!(
                "server acknowledged confirmation {} without confirming it",
                confirmation.id
            );
            return Err(DomainError::UnexpectedShape(format!(
                "payment confirmation {} is not confirmed after confirm",
                confirmation.id
            ))
            .into());
        }
        tracing::info!("payment confirmation {} confirmed", confirmation.id);
        Ok(acknowledged)
    }

    /// Rejects a requested payment. Confirmed payments are refused with
    /// [`LedgerError::ReversalRequired`] and deleted ones with
    /// [`LedgerError::TerminalState`].
    pub async fn delete_payment_confirmation(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<PaymentConfirmation> {
        confirmation.plan(Transition::Delete)?;

        self.repository
            .delete_payment_confirmation(confirmation.id)
            .await?;
        tracing::info!("payment confirmation {} deleted", confirmation.id);
        Ok(confirmation.apply(Transition::Delete, Utc::now().fixed_offset())?)
    }

    pub async fn payment_confirmations(
        &self,
        user_expense_id: i64,
    ) -> Result<Vec<PaymentConfirmation>> {
        Ok(self
            .repository
            .fetch_payment_confirmations(user_expense_id)
            .await?)
    }
}
