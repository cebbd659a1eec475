//! Outbound email.
//!
//! Emails are sent through a transactional email HTTP API (Resend-compatible: a JSON `POST` with a bearer key). Every
//! attempt, sent or failed, is written to the `email_logs` table. When email is disabled, messages are logged and
//! nothing else happens.
use buy_order_engine::{
    db_types::{EmailStatus, NewEmailLog},
    events::{EventHandlers, EventHooks, NotificationEvent, PriceAlertTriggeredEvent},
    NotificationApi,
    SqliteDatabase,
};
use futures::future::BoxFuture;
use log::*;
use serde::{Deserialize, Serialize};

use crate::config::EmailConfig;

pub const EMAIL_EVENT_BUFFER_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
struct EmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmailResponse {
    id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailOutcome {
    Sent(Option<String>),
    Skipped,
    Failed(String),
}

#[derive(Clone)]
pub struct EmailClient {
    config: EmailConfig,
    client: reqwest::Client,
}

impl EmailClient {
    pub fn new(config: EmailConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn send(&self, email: &Email) -> EmailOutcome {
        if !self.config.enabled {
            info!("✉️ Email delivery is disabled. Would have sent '{}' to {}", email.subject, email.to);
            return EmailOutcome::Skipped;
        }
        let body = EmailRequest {
            from: &self.config.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };
        let response =
            self.client.post(&self.config.api_url).bearer_auth(self.config.api_key.reveal()).json(&body).send().await;
        let response = match response {
            Ok(r) => r,
            Err(e) => return EmailOutcome::Failed(format!("Could not reach the email API. {e}")),
        };
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return EmailOutcome::Failed(format!("Email API returned {status}. {text}"));
        }
        match response.json::<EmailResponse>().await {
            Ok(r) => EmailOutcome::Sent(r.id),
            Err(e) => {
                debug!("✉️ Email was accepted, but the response could not be read. {e}");
                EmailOutcome::Sent(None)
            },
        }
    }
}

/// Sends the email and records the attempt. Skipped (disabled) sends are not recorded.
pub async fn deliver(client: &EmailClient, log: &NotificationApi<SqliteDatabase>, email: Email) {
    let entry = match client.send(&email).await {
        EmailOutcome::Skipped => return,
        EmailOutcome::Sent(id) => {
            info!("✉️ Sent '{}' to {}", email.subject, email.to);
            NewEmailLog {
                recipient: email.to,
                subject: email.subject,
                status: EmailStatus::Sent,
                provider_message_id: id,
                error: None,
            }
        },
        EmailOutcome::Failed(e) => {
            warn!("✉️ Could not send '{}' to {}. {e}", email.subject, email.to);
            NewEmailLog {
                recipient: email.to,
                subject: email.subject,
                status: EmailStatus::Failed,
                provider_message_id: None,
                error: Some(e),
            }
        },
    };
    if let Err(e) = log.record_email(entry).await {
        error!("✉️ Could not write to the email log. {e}");
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn render(to: &str, subject: &str, paragraphs: &[String]) -> Email {
    let html_body = paragraphs.iter().map(|p| format!("<p>{}</p>", escape_html(p))).collect::<String>();
    let html = format!(
        "<!DOCTYPE html><html><body style=\"font-family: sans-serif\"><h2>{}</h2>{html_body}</body></html>",
        escape_html(subject)
    );
    Email { to: to.to_string(), subject: subject.to_string(), html, text: paragraphs.join("\n\n") }
}

pub fn notification_email(event: &NotificationEvent) -> Option<Email> {
    let to = event.email.as_deref()?;
    let n = &event.notification;
    let mut paragraphs = vec![n.message.clone()];
    if let Some(id) = n.buy_order_id {
        paragraphs.push(format!("Buy order reference: #{id}"));
    }
    Some(render(to, &n.title, &paragraphs))
}

pub fn price_alert_email(event: &PriceAlertTriggeredEvent) -> Email {
    let PriceAlertTriggeredEvent { alert, product } = event;
    let subject = format!("Price alert: {} is now {}", product.title, product.current_price);
    let paragraphs = vec![
        format!(
            "Good news! {} has dropped to {}, which meets your alert price of {}.",
            product.title, product.current_price, alert.target_price
        ),
        "This alert has now been used up. Create a new one to keep watching this product.".to_string(),
    ];
    render(&alert.email, &subject, &paragraphs)
}

/// Builds the event handlers that turn notifications and triggered price alerts into emails.
pub fn create_email_event_handlers(client: EmailClient, db: SqliteDatabase) -> EventHandlers {
    let mut hooks = EventHooks::default();
    let log = NotificationApi::new(db);
    let (client_clone, log_clone) = (client.clone(), log.clone());
    hooks.on_notification(move |ev| {
        let Some(email) = notification_email(&ev) else {
            trace!("📬️ Notification #{} has no email address. Not sending an email.", ev.notification.id);
            return no_op();
        };
        let (client, log) = (client_clone.clone(), log_clone.clone());
        Box::pin(async move { deliver(&client, &log, email).await })
    });
    hooks.on_price_alert(move |ev| {
        let email = price_alert_email(&ev);
        let (client, log) = (client.clone(), log.clone());
        Box::pin(async move { deliver(&client, &log, email).await })
    });
    EventHandlers::new(EMAIL_EVENT_BUFFER_SIZE, hooks)
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}

#[cfg(test)]
mod test {
    use bo_common::Cents;
    use buy_order_engine::db_types::{
        AlertStatus,
        Notification,
        NotificationKind,
        PriceAlert,
        Product,
        ProductSource,
        RecipientKind,
    };
    use chrono::Utc;

    use super::*;

    fn notification() -> Notification {
        Notification {
            id: 1,
            recipient_kind: RecipientKind::Customer,
            recipient_id: 3,
            kind: NotificationKind::OrderFulfilled,
            title: "Your buy order was filled".into(),
            message: "Widget <XL> was bought for $75.00".into(),
            buy_order_id: Some(9),
            read_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn notifications_without_an_address_are_not_emailed() {
        let ev = NotificationEvent { notification: notification(), email: None };
        assert!(notification_email(&ev).is_none());
    }

    #[test]
    fn notification_emails_escape_html() {
        let ev = NotificationEvent { notification: notification(), email: Some("alice@example.com".into()) };
        let email = notification_email(&ev).unwrap();
        assert_eq!(email.to, "alice@example.com");
        assert_eq!(email.subject, "Your buy order was filled");
        assert!(email.html.contains("Widget &lt;XL&gt; was bought"));
        assert!(email.text.contains("Widget <XL> was bought for $75.00"));
        assert!(email.text.contains("#9"));
    }

    #[test]
    fn price_alert_emails() {
        let now = Utc::now();
        let product = Product {
            id: 4,
            merchant_id: 1,
            title: "Widget".into(),
            price: Cents::from(10_000),
            current_price: Cents::from(7_500),
            source: ProductSource::Manual,
            source_id: None,
            created_at: now,
            updated_at: now,
        };
        let alert = PriceAlert {
            id: 2,
            customer_id: 3,
            product_id: 4,
            email: "bob@example.com".into(),
            target_price: Cents::from(8_000),
            status: AlertStatus::Triggered,
            triggered_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        let email = price_alert_email(&PriceAlertTriggeredEvent { alert, product });
        assert_eq!(email.to, "bob@example.com");
        assert_eq!(email.subject, "Price alert: Widget is now $75.00");
        assert!(email.text.contains("meets your alert price of $80.00"));
    }

    #[tokio::test]
    async fn disabled_email_is_skipped() {
        let client = EmailClient::new(EmailConfig::default());
        let email = render("a@example.com", "Hi", &["Hello".to_string()]);
        assert_eq!(client.send(&email).await, EmailOutcome::Skipped);
    }
}
