//! Outbound mail seam.
//!
//! SMTP credentials come from configuration; the default implementation
//! logs the rendered message, which is the development delivery mode.
//! A real transport slots in behind [`Mailer`] without touching callers.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(String),
    #[error("mail not configured")]
    NotConfigured,
}

/// SMTP connection settings taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub from: String,
}

impl SmtpSettings {
    pub fn from_config(cfg: &AppConfig) -> Option<Self> {
        match (&cfg.smtp_host, &cfg.smtp_user, &cfg.smtp_pass) {
            (Some(host), Some(user), Some(_pass)) => Some(Self {
                host: host.clone(),
                port: cfg.smtp_port.unwrap_or(587),
                user: user.clone(),
                from: cfg
                    .smtp_from
                    .clone()
                    .unwrap_or_else(|| format!("no-reply@{}", host)),
            }),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome(&self, to: &str, name: &str) -> Result<(), MailError>;
}

/// Development mailer: renders the message and logs it.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(settings: Option<SmtpSettings>) -> Self {
        Self {
            from: settings
                .map(|s| s.from)
                .unwrap_or_else(|| "no-reply@localhost".to_string()),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_welcome(&self, to: &str, name: &str) -> Result<(), MailError> {
        let subject = "Welcome — please confirm your email";
        let body = format!(
            "Hi {},\n\nThanks for signing up! If you didn't create an account, \
             you can safely ignore this message.\n\n— The Team",
            name
        );
        info!(from = %self.from, %to, %subject, "welcome mail rendered\n{}", body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let mailer = LogMailer::new(None);
        mailer
            .send_welcome("ada@example.com", "Ada")
            .await
            .expect("log delivery cannot fail");
    }

    #[test]
    fn smtp_settings_require_host_user_and_pass() {
        let mut cfg_missing = crate_test_config();
        cfg_missing.smtp_host = Some("smtp.example.com".into());
        assert!(SmtpSettings::from_config(&cfg_missing).is_none());

        let mut cfg_ok = crate_test_config();
        cfg_ok.smtp_host = Some("smtp.example.com".into());
        cfg_ok.smtp_user = Some("mailer".into());
        cfg_ok.smtp_pass = Some("secret".into());
        let settings = SmtpSettings::from_config(&cfg_ok).expect("complete settings");
        assert_eq!(settings.port, 587);
        assert_eq!(settings.from, "no-reply@smtp.example.com");
    }

    fn crate_test_config() -> AppConfig {
        // Deserialize a minimal config rather than spelling out every field.
        let source = config::Config::builder()
            .set_default("database_url", "sqlite::memory:")
            .unwrap()
            .set_default("redis_url", "redis://localhost:6379")
            .unwrap()
            .set_default(
                "jwt_secret",
                "a-sufficiently-long-secret-value-used-only-inside-unit-tests-0123456789",
            )
            .unwrap()
            .set_default("jwt_expiration", 3600)
            .unwrap()
            .set_default("host", "127.0.0.1")
            .unwrap()
            .set_default("environment", "test")
            .unwrap()
            .build()
            .unwrap();
        source.try_deserialize().unwrap()
    }
}
