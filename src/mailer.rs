use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Mail delivery collaborator.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()>;
}

/// Sends through a transactional mail HTTP API (`POST {url}` with a bearer key).
pub struct HttpMailer {
    client: reqwest::Client,
    url: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct MailPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(url: &str, cfg: &MailConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("build mail http client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key: cfg.api_key.clone(),
            from: cfg.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        let payload = MailPayload {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            text: &email.text,
            html: &email.html,
        };
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("mail api request")?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("mail api answered {status}: {body}");
        }
        Ok(())
    }
}

/// Development sender: logs the recipient and subject, never the body.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        info!(to = %email.to, subject = %email.subject, "mail api not configured; email not delivered");
        Ok(())
    }
}

pub fn otp_email(to: &str, code: &str, valid_minutes: i64) -> OutgoingEmail {
    let text = format!(
        "Hello,\n\n\
         Your sign-in code is: {code}\n\n\
         The code is valid for {valid_minutes} minutes. If you did not request it, \
         you can ignore this email.\n\n\
         With metta,\nThe Retreat Center\n"
    );
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; color: #333; line-height: 1.6;">
  <p>Hello,</p>
  <p>Your <strong>sign-in code</strong> is:</p>
  <p style="font-size: 28px; font-weight: bold; letter-spacing: 4px;">{code}</p>
  <p>The code is valid for <strong>{valid_minutes} minutes</strong>. If you did not request it, you can ignore this email.</p>
  <p style="font-style: italic; color: #555;">With metta,<br/>The Retreat Center</p>
</div>"#
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: "Your sign-in code".to_string(),
        text,
        html,
    }
}
