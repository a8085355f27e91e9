use async_trait::async_trait;
use deal_core::Document;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{NotificationConfig, NotificationError, Notifier, SmtpTls};

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl SmtpNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| NotificationError::Config(format!("Invalid from address: {}", e)))?;

        let to = config
            .to
            .iter()
            .map(|addr| {
                addr.parse::<Mailbox>().map_err(|e| {
                    NotificationError::Config(format!("Invalid recipient '{}': {}", addr, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if to.is_empty() {
            return Err(NotificationError::Config("No recipients configured".into()));
        }

        let host = config.smtp_host.as_str();
        let builder = match config.smtp_tls {
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
            SmtpTls::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)),
        }
        .map_err(|e| NotificationError::Config(format!("SMTP transport error: {}", e)))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ))
            .build();

        Ok(Self { transport, from, to })
    }

    pub fn recipients(&self) -> &[Mailbox] {
        &self.to
    }

    fn compose(&self, subject: &str, document: &Document) -> Result<Message, NotificationError> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        builder
            .header(ContentType::TEXT_HTML)
            .body(document.html.clone())
            .map_err(|e| NotificationError::Delivery(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn deliver(&self, subject: &str, document: &Document) -> Result<(), NotificationError> {
        let email = self.compose(subject, document)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotificationError::Delivery(format!("Failed to send email: {}", e)))?;

        tracing::info!("Report emailed to {} recipients", self.to.len());
        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }
}
