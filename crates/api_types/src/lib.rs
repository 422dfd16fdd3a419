use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Chf,
    Pln,
    Sek,
}

/// Error body returned by the server on every non-success status.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

pub mod group {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct RegisteredMemberView {
        pub id: i64,
        pub display_name: String,
        pub phone: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ExternalMemberView {
        pub id: i64,
        pub display_name: String,
    }

    /// A group as returned by the server, without its expenses.
    ///
    /// Expenses are fetched separately through the group expenses
    /// endpoint.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: i64,
        pub name: String,
        pub description: Option<String>,
        pub estimated_price_minor: Option<i64>,
        pub currency: Currency,
        /// RFC3339 timestamp, including timezone offset.
        pub created_at: DateTime<FixedOffset>,
        pub owner_id: i64,
        /// `true` when the authenticated user owns the group.
        pub is_owner: bool,
        #[serde(default)]
        pub registered_members: Vec<RegisteredMemberView>,
        #[serde(default)]
        pub external_members: Vec<ExternalMemberView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupsResponse {
        pub groups: Vec<GroupView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
        pub description: Option<String>,
        pub estimated_price_minor: Option<i64>,
        pub currency: Currency,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupUpdate {
        pub name: Option<String>,
        pub description: Option<String>,
        pub estimated_price_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupCreated {
        pub id: i64,
    }

    /// Request body for adding a member.
    ///
    /// Registered members are looked up by phone number, external members
    /// are created from a display name only.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum MemberAdd {
        Registered { phone: String },
        External { display_name: String },
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MemberKind {
        Registered,
        External,
    }

    impl MemberKind {
        /// Path segment used by the member endpoints.
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Registered => "registered",
                Self::External => "external",
            }
        }
    }
}

pub mod expense {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct RegisteredSplitView {
        /// Identifier of the debtor's share (a "user expense").
        pub id: i64,
        pub debtor_id: i64,
        pub amount_minor: i64,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ExternalSplitView {
        pub id: i64,
        pub debtor_external_id: i64,
        pub amount_minor: i64,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: i64,
        pub group_id: i64,
        pub total_minor: i64,
        pub creditor_registered_id: Option<i64>,
        pub creditor_external_id: Option<i64>,
        #[serde(default)]
        pub registered_splits: Vec<RegisteredSplitView>,
        #[serde(default)]
        pub external_splits: Vec<ExternalSplitView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpensesResponse {
        pub expenses: Vec<ExpenseView>,
    }
}

pub mod settlement {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentConfirmationNew {
        pub user_expense_id: i64,
        /// Must be > 0.
        pub amount_minor: i64,
        /// Idempotency key for safely retrying the same create request.
        pub idempotency_key: Uuid,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct PaymentConfirmationView {
        pub id: i64,
        pub user_expense_id: i64,
        pub confirmation_amount_minor: i64,
        /// RFC3339 timestamp, including timezone offset.
        pub confirmation_date: DateTime<FixedOffset>,
        pub is_confirmed: bool,
        pub confirmed_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentConfirmationsResponse {
        pub confirmations: Vec<PaymentConfirmationView>,
    }
}

pub mod notification {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct NotificationView {
        pub id: i64,
        pub message: String,
        pub created_at: DateTime<FixedOffset>,
        pub is_read: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct NotificationsResponse {
        pub notifications: Vec<NotificationView>,
    }
}
