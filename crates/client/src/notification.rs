use api_types::notification::NotificationView;
use chrono::{DateTime, FixedOffset};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub id: i64,
    pub message: String,
    pub created_at: DateTime<FixedOffset>,
    pub is_read: bool,
}

impl From<NotificationView> for Notification {
    fn from(view: NotificationView) -> Self {
        Self {
            id: view.id,
            message: view.message,
            created_at: view.created_at,
            is_read: view.is_read,
        }
    }
}
