//! The repository boundary.
//!
//! This is the only place where transport failures and response parsing
//! are handled. Every call ends in a success value or exactly one
//! [`DomainError`]:
//!
//! - the transport failed → [`DomainError::Connection`];
//! - non-success status → [`DomainError::Api`] with the body's `message`,
//!   or [`DEFAULT_API_ERROR_MESSAGE`] when the body is not `{message}`;
//! - success body that does not fit the expected type, or that breaks a
//!   ledger invariant → [`DomainError::UnexpectedShape`].

use std::sync::Arc;

use api_types::{
    ErrorBody,
    expense::ExpensesResponse,
    group::{GroupNew, GroupUpdate, GroupView, GroupsResponse, MemberAdd, MemberKind},
    notification::NotificationsResponse,
    settlement::{PaymentConfirmationNew, PaymentConfirmationView, PaymentConfirmationsResponse},
};
use ledger::{Currency, Expense, Group, LedgerError, MemberKey, Money, PaymentConfirmation};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
    Notification, convert,
    error::{DEFAULT_API_ERROR_MESSAGE, DomainError},
    transport::{ApiRequest, RawResponse, Transport},
};

type ResultRepository<T> = std::result::Result<T, DomainError>;

/// Fields of a group the server lets the owner edit.
#[derive(Clone, Debug, Default)]
pub struct GroupChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub estimated_price: Option<Money>,
}

#[derive(Clone)]
pub struct Repository {
    transport: Arc<dyn Transport>,
}

impl Repository {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Sends `request` and decodes a success body as `T`.
    pub async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> ResultRepository<T> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        serde_json::from_slice::<T>(&response.body).map_err(|err| {
            tracing::error!("unexpected response shape from {path}: {err}");
            DomainError::UnexpectedShape(err.to_string())
        })
    }

    /// Sends `request` and ignores the success body.
    pub async fn call_unit(&self, request: ApiRequest) -> ResultRepository<()> {
        self.send(request).await.map(|_| ())
    }

    async fn send(&self, request: ApiRequest) -> ResultRepository<RawResponse> {
        let path = request.path.clone();
        let response = self.transport.execute(request).await.map_err(|err| {
            tracing::warn!("request to {path} failed: {err}");
            DomainError::Connection(err.to_string())
        })?;

        if response.is_success() {
            return Ok(response);
        }

        let message = serde_json::from_slice::<ErrorBody>(&response.body)
            .map(|err| err.message)
            .unwrap_or_else(|_| DEFAULT_API_ERROR_MESSAGE.to_string());
        tracing::warn!("request to {path} rejected ({}): {message}", response.status);
        Err(DomainError::Api {
            status: response.status,
            message,
        })
    }

    pub async fn fetch_groups(&self) -> ResultRepository<Vec<Group>> {
        let response: GroupsResponse = self.call(ApiRequest::get("groups")).await?;
        response
            .groups
            .into_iter()
            .map(|view| convert::group(view).map_err(shape))
            .collect()
    }

    /// Group metadata and membership, without expenses.
    pub async fn fetch_group(&self, group_id: i64) -> ResultRepository<Group> {
        let view: GroupView = self.call(ApiRequest::get(format!("groups/{group_id}"))).await?;
        convert::group(view).map_err(shape)
    }

    pub async fn fetch_group_expenses(&self, group_id: i64) -> ResultRepository<Vec<Expense>> {
        let response: ExpensesResponse = self
            .call(ApiRequest::get(format!("groups/{group_id}/expenses")))
            .await?;
        let expenses = response
            .expenses
            .into_iter()
            .map(|view| convert::expense(view).map_err(shape))
            .collect::<ResultRepository<Vec<_>>>()?;

        for expense in &expenses {
            let unallocated = expense.unallocated().map_err(shape)?;
            if !unallocated.is_zero() {
                tracing::warn!(
                    "expense {} of group {group_id} has {unallocated} not covered by splits",
                    expense.id
                );
            }
        }
        Ok(expenses)
    }

    /// Group and expenses, validated together.
    pub async fn load_group(&self, group_id: i64) -> ResultRepository<Group> {
        let group = self.fetch_group(group_id).await?;
        let expenses = self.fetch_group_expenses(group_id).await?;
        group.with_expenses(expenses).map_err(shape)
    }

    pub async fn create_group(
        &self,
        name: &str,
        description: Option<String>,
        estimated_price: Option<Money>,
        currency: Currency,
    ) -> ResultRepository<Group> {
        let payload = GroupNew {
            name: name.to_string(),
            description,
            estimated_price_minor: estimated_price.map(Money::minor),
            currency: convert::api_currency(currency),
        };
        let view: GroupView = self
            .call(ApiRequest::post("groups", Some(json(&payload)?)))
            .await?;
        convert::group(view).map_err(shape)
    }

    pub async fn update_group(
        &self,
        group_id: i64,
        changes: GroupChanges,
    ) -> ResultRepository<Group> {
        let payload = GroupUpdate {
            name: changes.name,
            description: changes.description,
            estimated_price_minor: changes.estimated_price.map(Money::minor),
        };
        let view: GroupView = self
            .call(ApiRequest::patch(format!("groups/{group_id}"), json(&payload)?))
            .await?;
        convert::group(view).map_err(shape)
    }

    pub async fn delete_group(&self, group_id: i64) -> ResultRepository<()> {
        self.call_unit(ApiRequest::delete(format!("groups/{group_id}")))
            .await
    }

    pub async fn leave_group(&self, group_id: i64) -> ResultRepository<()> {
        self.call_unit(ApiRequest::post(format!("groups/{group_id}/leave"), None))
            .await
    }

    /// Adds a registered user, looked up by phone number. Returns the
    /// updated membership.
    pub async fn add_registered_member(
        &self,
        group_id: i64,
        phone: &str,
    ) -> ResultRepository<Group> {
        self.add_member(
            group_id,
            MemberAdd::Registered {
                phone: phone.to_string(),
            },
        )
        .await
    }

    pub async fn add_external_member(
        &self,
        group_id: i64,
        display_name: &str,
    ) -> ResultRepository<Group> {
        self.add_member(
            group_id,
            MemberAdd::External {
                display_name: display_name.to_string(),
            },
        )
        .await
    }

    async fn add_member(&self, group_id: i64, member: MemberAdd) -> ResultRepository<Group> {
        let view: GroupView = self
            .call(ApiRequest::post(
                format!("groups/{group_id}/members"),
                Some(json(&member)?),
            ))
            .await?;
        convert::group(view).map_err(shape)
    }

    pub async fn remove_member(&self, group_id: i64, member: MemberKey) -> ResultRepository<Group> {
        let (kind, member_id) = match member {
            MemberKey::Registered(id) => (MemberKind::Registered, id),
            MemberKey::External(id) => (MemberKind::External, id),
        };
        let view: GroupView = self
            .call(ApiRequest::delete(format!(
                "groups/{group_id}/members/{}/{member_id}",
                kind.as_str()
            )))
            .await?;
        convert::group(view).map_err(shape)
    }

    /// Creates a confirmation in the requested state.
    ///
    /// The same `idempotency_key` may be resent after a connection error
    /// without creating a duplicate.
    pub async fn request_payment_confirmation(
        &self,
        user_expense_id: i64,
        amount: Money,
        idempotency_key: Uuid,
    ) -> ResultRepository<PaymentConfirmation> {
        let payload = PaymentConfirmationNew {
            user_expense_id,
            amount_minor: amount.minor(),
            idempotency_key,
        };
        let view: PaymentConfirmationView = self
            .call(ApiRequest::post(
                "payment-confirmations",
                Some(json(&payload)?),
            ))
            .await?;
        convert::payment_confirmation(view).map_err(shape)
    }

    pub async fn confirm_payment_confirmation(
        &self,
        confirmation_id: i64,
    ) -> ResultRepository<PaymentConfirmation> {
        let view: PaymentConfirmationView = self
            .call(ApiRequest::post(
                format!("payment-confirmations/{confirmation_id}/confirm"),
                None,
            ))
            .await?;
        convert::payment_confirmation(view).map_err(shape)
    }

    pub async fn delete_payment_confirmation(&self, confirmation_id: i64) -> ResultRepository<()> {
        self.call_unit(ApiRequest::delete(format!(
            "payment-confirmations/{confirmation_id}"
        )))
        .await
    }

    pub async fn fetch_payment_confirmations(
        &self,
        user_expense_id: i64,
    ) -> ResultRepository<Vec<PaymentConfirmation>> {
        let response: PaymentConfirmationsResponse = self
            .call(ApiRequest::get(format!(
                "user-expenses/{user_expense_id}/payment-confirmations"
            )))
            .await?;
        response
            .confirmations
            .into_iter()
            .map(|view| convert::payment_confirmation(view).map_err(shape))
            .collect()
    }

    pub async fn fetch_notifications(&self) -> ResultRepository<Vec<Notification>> {
        let response: NotificationsResponse = self.call(ApiRequest::get("notifications")).await?;
        Ok(response.notifications.into_iter().map(Into::into).collect())
    }

    pub async fn fetch_unread_notifications(&self) -> ResultRepository<Vec<Notification>> {
        let response: NotificationsResponse = self
            .call(ApiRequest::get("notifications/unread"))
            .await?;
        Ok(response.notifications.into_iter().map(Into::into).collect())
    }

    pub async fn mark_notification_read(&self, notification_id: i64) -> ResultRepository<()> {
        self.call_unit(ApiRequest::post(
            format!("notifications/{notification_id}/read"),
            None,
        ))
        .await
    }
}

/// A payload the server sent but the ledger refuses to model.
fn shape(err: LedgerError) -> DomainError {
    tracing::error!("server payload violates ledger invariants: {err}");
    DomainError::UnexpectedShape(err.to_string())
}

fn json<T: Serialize>(payload: &T) -> ResultRepository<serde_json::Value> {
    serde_json::to_value(payload).map_err(|err| {
        tracing::error!("failed to encode request body: {err}");
        DomainError::UnexpectedShape(err.to_string())
    })
}
