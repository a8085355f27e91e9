mod smtp;

pub use smtp::SmtpNotifier;

use async_trait::async_trait;
use deal_core::Document;

/// Delivery of a finished report to its recipients.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, subject: &str, document: &Document) -> Result<(), NotificationError>;
    fn name(&self) -> &str;
}

/// Errors from the notification system.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Delivery error: {0}")]
    Delivery(String),
}

/// SMTP delivery settings.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from: String,
    pub to: Vec<String>,
    pub smtp_tls: SmtpTls,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SmtpTls {
    #[default]
    StartTls,
    Tls,
    None,
}

impl NotificationConfig {
    /// Load from environment variables.
    pub fn from_env() -> Result<Self, NotificationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `EMAIL_FROM`, `EMAIL_PASSWORD` and at least
    /// one `EMAIL_TO` address are mandatory.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, NotificationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            var(key).ok_or_else(|| NotificationError::Config(format!("{} not set", key)))
        };

        let from = required("EMAIL_FROM")?;
        let smtp_password = required("EMAIL_PASSWORD")?;

        let to: Vec<String> = var("EMAIL_TO")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if to.is_empty() {
            return Err(NotificationError::Config("EMAIL_TO not set".into()));
        }

        let smtp_port = match var("SMTP_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| NotificationError::Config(format!("invalid SMTP_PORT '{}'", raw)))?,
            None => 587,
        };

        let tls_mode = var("SMTP_TLS").unwrap_or_default();
        let smtp_tls = match tls_mode.to_lowercase().as_str() {
            "" | "starttls" => SmtpTls::StartTls,
            "tls" => SmtpTls::Tls,
            "none" => SmtpTls::None,
            _ => {
                return Err(NotificationError::Config(format!(
                    "invalid SMTP_TLS '{}'",
                    tls_mode
                )))
            }
        };

        Ok(Self {
            smtp_host: var("SMTP_SERVER").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            smtp_port,
            smtp_username: var("SMTP_USERNAME").unwrap_or_else(|| from.clone()),
            smtp_password,
            from,
            to,
            smtp_tls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = NotificationConfig::from_lookup(lookup(&[
            ("EMAIL_FROM", "tracker@example.com"),
            ("EMAIL_PASSWORD", "secret"),
            ("EMAIL_TO", "a@example.com, b@example.com,"),
        ]))
        .unwrap();

        assert_eq!(config.smtp_host, "smtp.gmail.com");
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.smtp_username, "tracker@example.com");
        assert_eq!(config.to, vec!["a@example.com", "b@example.com"]);
        assert_eq!(config.smtp_tls, SmtpTls::StartTls);
    }

    #[test]
    fn test_overrides() {
        let config = NotificationConfig::from_lookup(lookup(&[
            ("EMAIL_FROM", "tracker@example.com"),
            ("EMAIL_PASSWORD", "secret"),
            ("EMAIL_TO", "a@example.com"),
            ("SMTP_SERVER", "mail.example.com"),
            ("SMTP_PORT", "465"),
            ("SMTP_TLS", "TLS"),
            ("SMTP_USERNAME", "relay-user"),
        ]))
        .unwrap();

        assert_eq!(config.smtp_host, "mail.example.com");
        assert_eq!(config.smtp_port, 465);
        assert_eq!(config.smtp_tls, SmtpTls::Tls);
        assert_eq!(config.smtp_username, "relay-user");
    }

    #[test]
    fn test_missing_mandatory_values() {
        let err = NotificationConfig::from_lookup(lookup(&[
            ("EMAIL_PASSWORD", "secret"),
            ("EMAIL_TO", "a@example.com"),
        ]))
        .unwrap_err();
        assert!(matches!(err, NotificationError::Config(ref m) if m.contains("EMAIL_FROM")));

        let err = NotificationConfig::from_lookup(lookup(&[
            ("EMAIL_FROM", "tracker@example.com"),
            ("EMAIL_PASSWORD", "secret"),
            ("EMAIL_TO", " , "),
        ]))
        .unwrap_err();
        assert!(matches!(err, NotificationError::Config(ref m) if m.contains("EMAIL_TO")));
    }

    #[test]
    fn test_invalid_tls_mode() {
        let err = NotificationConfig::from_lookup(lookup(&[
            ("EMAIL_FROM", "tracker@example.com"),
            ("EMAIL_PASSWORD", "secret"),
            ("EMAIL_TO", "a@example.com"),
            ("SMTP_TLS", "ssl"),
        ]))
        .unwrap_err();
        assert!(matches!(err, NotificationError::Config(ref m) if m.contains("SMTP_TLS 'ssl'")));

        let config = NotificationConfig::from_lookup(lookup(&[
            ("EMAIL_FROM", "tracker@example.com"),
            ("EMAIL_PASSWORD", "secret"),
            ("EMAIL_TO", "a@example.com"),
            ("SMTP_TLS", "StartTLS"),
        ]))
        .unwrap();
        assert_eq!(config.smtp_tls, SmtpTls::StartTls);
    }

    #[test]
    fn test_invalid_port() {
        let err = NotificationConfig::from_lookup(lookup(&[
            ("EMAIL_FROM", "tracker@example.com"),
            ("EMAIL_PASSWORD", "secret"),
            ("EMAIL_TO", "a@example.com"),
            ("SMTP_PORT", "smtp"),
        ]))
        .unwrap_err();
        assert!(matches!(err, NotificationError::Config(_)));
    }
}
