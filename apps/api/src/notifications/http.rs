//! SendGrid (mail) and Twilio (SMS) over plain HTTPS.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::config::Config;
use crate::notifications::{Notifier, NotifyError};

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
struct TwilioCredentials {
    account_sid: String,
    auth_token: String,
    from_number: String,
}

/// Notifier backed by the provider HTTP APIs. A channel without credentials returns
/// `NotConfigured` instead of calling out.
#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
    sendgrid_api_key: Option<String>,
    from_email: String,
    twilio: Option<TwilioCredentials>,
}

impl HttpNotifier {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let twilio = match (
            &config.twilio_account_sid,
            &config.twilio_auth_token,
            &config.twilio_from_number,
        ) {
            (Some(sid), Some(token), Some(from)) => Some(TwilioCredentials {
                account_sid: sid.clone(),
                auth_token: token.clone(),
                from_number: from.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            sendgrid_api_key: config.sendgrid_api_key.clone(),
            from_email: config.sendgrid_from_email.clone(),
            twilio,
        })
    }

    pub fn email_enabled(&self) -> bool {
        self.sendgrid_api_key.is_some()
    }

    pub fn sms_enabled(&self) -> bool {
        self.twilio.is_some()
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Provider {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        let api_key = self
            .sendgrid_api_key
            .as_deref()
            .ok_or(NotifyError::NotConfigured("SendGrid"))?;

        let body = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from_email },
            "subject": subject,
            "content": [{ "type": "text/html", "value": html_body }],
        });

        debug!(to, subject, "Sending email via SendGrid");
        let response = self
            .client
            .post(SENDGRID_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        check_status(response).await
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        let twilio = self
            .twilio
            .as_ref()
            .ok_or(NotifyError::NotConfigured("Twilio"))?;

        let url = format!(
            "{TWILIO_API_BASE}/Accounts/{}/Messages.json",
            twilio.account_sid
        );
        debug!(to, "Sending SMS via Twilio");
        let response = self
            .client
            .post(url)
            .basic_auth(&twilio.account_sid, Some(&twilio.auth_token))
            .form(&[("To", to), ("From", twilio.from_number.as_str()), ("Body", body)])
            .send()
            .await?;
        check_status(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            database_url: "postgres://localhost/talentiq".into(),
            s3_bucket: "talentiq".into(),
            s3_endpoint: "http://localhost:9000".into(),
            aws_access_key_id: "minio".into(),
            aws_secret_access_key: "minio123".into(),
            jwt_secret: "secret".into(),
            jwt_expiry_mins: 60,
            openai_api_key: None,
            sendgrid_api_key: None,
            sendgrid_from_email: "noreply@talentiq.com".into(),
            twilio_account_sid: Some("AC123".into()),
            twilio_auth_token: None,
            twilio_from_number: Some("+15550000000".into()),
            base_url: "http://localhost:8080".into(),
            port: 8080,
            rust_log: "info".into(),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_channels_do_not_call_out() {
        let notifier = HttpNotifier::from_config(&config()).unwrap();
        assert!(!notifier.email_enabled());
        // Partial Twilio credentials disable SMS entirely.
        assert!(!notifier.sms_enabled());

        let err = notifier.send_email("a@b.com", "s", "b").await.unwrap_err();
        assert!(matches!(err, NotifyError::NotConfigured("SendGrid")));
        let err = notifier.send_sms("+15551234567", "b").await.unwrap_err();
        assert!(matches!(err, NotifyError::NotConfigured("Twilio")));
    }
}
