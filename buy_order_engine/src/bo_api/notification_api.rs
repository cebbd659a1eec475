use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{EmailLog, NewEmailLog, Notification, Recipient},
    traits::{NotificationApiError, NotificationManagement},
};

/// Read access to in-app notifications, and the outbound email log.
pub struct NotificationApi<B> {
    db: B,
}

impl<B> Debug for NotificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi")
    }
}

impl<B: Clone> Clone for NotificationApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> NotificationApi<B>
where B: NotificationManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn notifications_for(&self, recipient: Recipient) -> Result<Vec<Notification>, NotificationApiError> {
        self.db.notifications_for(recipient).await
    }

    /// Marks one of the recipient's notifications as read. Marking it again is harmless.
    pub async fn mark_read(&self, recipient: Recipient, id: i64) -> Result<Notification, NotificationApiError> {
        self.db.mark_notification_read(recipient, id).await
    }

    pub async fn record_email(&self, entry: NewEmailLog) -> Result<EmailLog, NotificationApiError> {
        let log = self.db.insert_email_log(entry).await?;
        trace!("✉️ Email to {} logged as {}", log.recipient, log.status);
        Ok(log)
    }

    pub async fn email_logs(&self, limit: i64) -> Result<Vec<EmailLog>, NotificationApiError> {
        self.db.email_logs(limit.clamp(1, 500)).await
    }
}
