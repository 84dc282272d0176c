//! Outbound e-mail and SMS.
//!
//! Delivery is always best-effort: callers use [`deliver`], which logs failures and
//! reports whether each channel went out. A request never fails because a notification
//! could not be sent.

pub mod http;
pub mod templates;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub use http::HttpNotifier;
pub use templates::Notification;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError>;

    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError>;
}

/// Where to reach the recipient. `phone` is optional; e-mail is always attempted.
#[derive(Debug, Clone, Copy)]
pub struct Recipient<'a> {
    pub email: &'a str,
    pub phone: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub email_sent: bool,
    pub sms_sent: bool,
}

pub async fn deliver(
    notifier: &dyn Notifier,
    recipient: Recipient<'_>,
    notification: &Notification,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    match notifier
        .send_email(recipient.email, &notification.subject, &notification.html_body)
        .await
    {
        Ok(()) => {
            report.email_sent = true;
            info!(to = recipient.email, subject = %notification.subject, "Email sent");
        }
        Err(e) => warn!(to = recipient.email, "Email not sent: {e}"),
    }

    if let (Some(phone), Some(sms)) = (recipient.phone, notification.sms_body.as_deref()) {
        match notifier.send_sms(phone, sms).await {
            Ok(()) => report.sms_sent = true,
            Err(e) => warn!("SMS not sent: {e}"),
        }
    }

    report
}


#[cfg(test)]
mod tests {
    use super::mock::RecordingNotifier;
    use super::*;

    fn note(sms: Option<&str>) -> Notification {
        Notification {
            subject: "Interview Scheduled".into(),
            html_body: "<p>hi</p>".into(),
            sms_body: sms.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_deliver_sends_both_channels() {
        let notifier = RecordingNotifier::default();
        let recipient = Recipient {
            email: "jane@techcorp.com",
            phone: Some("+15551234567"),
        };
        let report = deliver(&notifier, recipient, &note(Some("See you"))).await;
        assert_eq!(
            report,
            DeliveryReport {
                email_sent: true,
                sms_sent: true
            }
        );
        assert_eq!(notifier.emails.lock().unwrap()[0].1, "Interview Scheduled");
    }

    #[tokio::test]
    async fn test_sms_skipped_without_phone_or_body() {
        let notifier = RecordingNotifier::default();
        let no_phone = Recipient {
            email: "jane@techcorp.com",
            phone: None,
        };
        let report = deliver(&notifier, no_phone, &note(Some("See you"))).await;
        assert!(!report.sms_sent);

        let with_phone = Recipient {
            email: "jane@techcorp.com",
            phone: Some("+15551234567"),
        };
        let report = deliver(&notifier, with_phone, &note(None)).await;
        assert!(!report.sms_sent);
        assert!(notifier.sms.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_reported_not_raised() {
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let recipient = Recipient {
            email: "jane@techcorp.com",
            phone: Some("+15551234567"),
        };
        let report = deliver(&notifier, recipient, &note(Some("x"))).await;
        assert_eq!(report, DeliveryReport::default());
    }
}
