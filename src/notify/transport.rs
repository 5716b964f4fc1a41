use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport as LettreSmtpTransport, Transport};
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};

use super::OutgoingMessage;
use crate::configuration::SmtpSettings;

#[async_trait]
pub trait NotificationTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send_batch(&self, messages: Vec<OutgoingMessage>) -> anyhow::Result<()>;
}

/// 개발용. 메일 대신 로그로 남긴다.
pub struct ConsoleTransport;

#[async_trait]
impl NotificationTransport for ConsoleTransport {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn send_batch(&self, messages: Vec<OutgoingMessage>) -> anyhow::Result<()> {
        for message in &messages {
            info!(
                to = %message.to,
                subject = %message.subject,
                body = %message.body,
                "알림 메일 (console)"
            );
        }
        Ok(())
    }
}

pub struct SmtpTransport {
    settings: SmtpSettings,
    from: String,
    timeout: Duration,
}

impl SmtpTransport {
    pub fn new(settings: SmtpSettings, from: String, timeout: Duration) -> Self {
        Self {
            settings,
            from,
            timeout,
        }
    }

    fn connect(&self) -> anyhow::Result<LettreSmtpTransport> {
        let mut builder = LettreSmtpTransport::relay(&self.settings.host)
            .with_context(|| format!("invalid SMTP relay '{}'", self.settings.host))?
            .port(self.settings.port)
            .timeout(Some(self.timeout));

        if let (Some(username), Some(password)) = (&self.settings.username, &self.settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    fn build_message(&self, message: &OutgoingMessage) -> anyhow::Result<Message> {
        Message::builder()
            .from(self.from.parse().with_context(|| format!("invalid MAIL_FROM '{}'", self.from))?)
            .to(message.to.parse().with_context(|| format!("invalid recipient '{}'", message.to))?)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .context("failed to build email")
    }

    /// 주소가 잘못된 메일은 건너뛰고 실패 건수로만 센다.
    fn build_batch(&self, messages: &[OutgoingMessage]) -> (Vec<(String, Message)>, usize) {
        let mut emails = Vec::with_capacity(messages.len());
        let mut failed = 0usize;
        for message in messages {
            match self.build_message(message) {
                Ok(email) => emails.push((message.to.clone(), email)),
                Err(err) => {
                    warn!(to = %message.to, error = %err, "메일 작성 실패, 건너뜀");
                    failed += 1;
                }
            }
        }
        (emails, failed)
    }
}

#[async_trait]
impl NotificationTransport for SmtpTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    /// 한 배치는 한 번의 SMTP 연결로 보낸다. 개별 실패는 나머지 발송을 막지 않는다.
    async fn send_batch(&self, messages: Vec<OutgoingMessage>) -> anyhow::Result<()> {
        let total = messages.len();
        let (emails, mut failed) = self.build_batch(&messages);

        if !emails.is_empty() {
            let mailer = self.connect()?;
            failed += tokio::task::spawn_blocking(move || {
                let mut failed = 0usize;
                for (to, email) in emails {
                    if let Err(err) = mailer.send(&email) {
                        warn!(to = %to, error = %err, "메일 발송 실패");
                        failed += 1;
                    }
                }
                failed
            })
            .await
            .context("SMTP worker panicked")?;
        }

        if failed > 0 {
            return Err(anyhow!("{} of {} emails failed", failed, total));
        }
        Ok(())
    }
}

/// 배치 전체를 JSON 한 번으로 POST 한다. `text` 필드는 Slack 호환 웹훅용 요약.
pub struct WebhookTransport {
    client: Client,
    url: String,
}

impl WebhookTransport {
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build webhook client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl NotificationTransport for WebhookTransport {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send_batch(&self, messages: Vec<OutgoingMessage>) -> anyhow::Result<()> {
        let summary = messages
            .iter()
            .map(|m| format!("{} -> {}", m.subject, m.to))
            .collect::<Vec<_>>()
            .join("\n");
        let payload = json!({ "text": summary, "messages": messages });

        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?; // 2xx 아닌 경우 Err

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp(from: &str) -> SmtpTransport {
        SmtpTransport::new(
            SmtpSettings {
                host: "localhost".to_string(),
                port: 25,
                username: None,
                password: None,
            },
            from.to_string(),
            Duration::from_secs(1),
        )
    }

    fn message(to: &str) -> OutgoingMessage {
        OutgoingMessage {
            to: to.to_string(),
            subject: "[#1] Printer jam".to_string(),
            body: "new reply".to_string(),
        }
    }

    #[test]
    fn bad_recipient_is_skipped_without_dropping_the_batch() {
        let transport = smtp("helpdesk@example.com");
        let batch = vec![message("foo@"), message("bob@example.com"), message("carol@example.com")];

        let (emails, failed) = transport.build_batch(&batch);

        assert_eq!(failed, 1);
        let recipients: Vec<&str> = emails.iter().map(|(to, _)| to.as_str()).collect();
        assert_eq!(recipients, vec!["bob@example.com", "carol@example.com"]);
    }

    #[tokio::test]
    async fn batch_of_only_bad_recipients_fails_without_connecting() {
        let transport = smtp("helpdesk@example.com");

        let err = transport.send_batch(vec![message("foo@"), message("not an address")]).await.unwrap_err();

        assert_eq!(err.to_string(), "2 of 2 emails failed");
    }
}
