use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailBackend {
    Console,
    Smtp,
    Webhook,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub backend: MailBackend,
    pub from: String,
    pub smtp: Option<SmtpSettings>,
    pub webhook_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    /// 알림 메일의 티켓 링크에 쓰이는 외부 주소
    pub site_url: String,
    pub media_root: PathBuf,
    pub media_url: String,
    pub mail: MailSettings,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let backend = match optional("MAIL_BACKEND").as_deref() {
            None | Some("console") => MailBackend::Console,
            Some("smtp") => MailBackend::Smtp,
            Some("webhook") => MailBackend::Webhook,
            Some(other) => return Err(anyhow!("unknown MAIL_BACKEND '{}'", other)),
        };

        let smtp = match optional("SMTP_HOST") {
            Some(host) => Some(SmtpSettings {
                host,
                port: parse_or("SMTP_PORT", 587)?,
                username: optional("SMTP_USERNAME"),
                password: optional("SMTP_PASSWORD"),
            }),
            None => None,
        };

        let mail = MailSettings {
            backend,
            from: optional("MAIL_FROM").unwrap_or_else(|| "helpdesk@localhost".to_string()),
            smtp,
            webhook_url: optional("MAIL_WEBHOOK_URL"),
            timeout: Duration::from_secs(parse_or("NOTIFY_TIMEOUT_SECS", 10)?),
        };

        let port = parse_or("APP_PORT", 8080)?;
        let host = optional("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            site_url: optional("SITE_URL").unwrap_or_else(|| format!("http://{}:{}", host, port)),
            host,
            port,
            media_root: PathBuf::from(optional("MEDIA_ROOT").unwrap_or_else(|| "./media".to_string())),
            media_url: optional("MEDIA_URL").unwrap_or_else(|| "/media/".to_string()),
            mail,
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}
