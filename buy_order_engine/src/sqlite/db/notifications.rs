use sqlx::SqliteConnection;

use crate::db_types::{EmailLog, NewEmailLog, NewNotification, Notification, Recipient};

pub async fn insert_notification(
    notification: NewNotification,
    conn: &mut SqliteConnection,
) -> Result<Notification, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO notifications (recipient_kind, recipient_id, kind, title, message, buy_order_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(notification.recipient.kind)
    .bind(notification.recipient.id)
    .bind(notification.kind)
    .bind(notification.title)
    .bind(notification.message)
    .bind(notification.buy_order_id)
    .fetch_one(conn)
    .await
}

pub async fn notifications_for(
    recipient: Recipient,
    conn: &mut SqliteConnection,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM notifications WHERE recipient_kind = $1 AND recipient_id = $2
            ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(recipient.kind)
    .bind(recipient.id)
    .fetch_all(conn)
    .await
}

/// Marks the recipient's notification as read, keeping the first `read_at` if it was already read.
pub async fn mark_read(
    recipient: Recipient,
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE notifications SET read_at = COALESCE(read_at, CURRENT_TIMESTAMP)
            WHERE id = $1 AND recipient_kind = $2 AND recipient_id = $3
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(recipient.kind)
    .bind(recipient.id)
    .fetch_optional(conn)
    .await
}

pub async fn insert_email_log(entry: NewEmailLog, conn: &mut SqliteConnection) -> Result<EmailLog, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO email_logs (recipient, subject, status, provider_message_id, error)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(entry.recipient)
    .bind(entry.subject)
    .bind(entry.status)
    .bind(entry.provider_message_id)
    .bind(entry.error)
    .fetch_one(conn)
    .await
}

pub async fn email_logs(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<EmailLog>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM email_logs ORDER BY created_at DESC, id DESC LIMIT $1")
        .bind(limit)
        .fetch_all(conn)
        .await
}
