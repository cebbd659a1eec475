use thiserror::Error;

use crate::db_types::{EmailLog, NewEmailLog, NewNotification, Notification, Recipient};

#[derive(Debug, Clone, Error)]
pub enum NotificationApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Notification {0} does not exist")]
    NotificationNotFound(i64),
}

impl From<sqlx::Error> for NotificationApiError {
    fn from(e: sqlx::Error) -> Self {
        NotificationApiError::DatabaseError(e.to_string())
    }
}

/// In-app notifications and the log of every outbound email attempt.
#[allow(async_fn_in_trait)]
pub trait NotificationManagement {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, NotificationApiError>;

    /// Notifications for the recipient, newest first.
    async fn notifications_for(&self, recipient: Recipient) -> Result<Vec<Notification>, NotificationApiError>;

    /// Marks the notification as read. Only the recipient's own notifications can be marked; marking an already read
    /// notification leaves the original `read_at` in place.
    async fn mark_notification_read(
        &self,
        recipient: Recipient,
        id: i64,
    ) -> Result<Notification, NotificationApiError>;

    async fn insert_email_log(&self, entry: NewEmailLog) -> Result<EmailLog, NotificationApiError>;

    /// The most recent email log entries, newest first.
    async fn email_logs(&self, limit: i64) -> Result<Vec<EmailLog>, NotificationApiError>;
}
