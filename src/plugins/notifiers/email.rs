use crate::config::SmtpConfig;
use crate::plugins::traits::{DeliveryReceipt, MessageChannel};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

const MAX_SUBJECT_CHARS: usize = 120;

pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailChannel {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from_address = config
            .from_address
            .as_deref()
            .ok_or_else(|| AppError::Validation("SMTP from_address is not set".into()))?;
        let from: Mailbox = format!("{} <{}>", config.from_name, from_address)
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid from address: {}", e)))?;

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| AppError::Validation(format!("Invalid SMTP relay: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        let mut builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(EmailChannel {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, destination: &str, text: &str) -> Result<Message> {
        let to: Mailbox = destination
            .parse()
            .map_err(|e| AppError::delivery("email", format!("Invalid recipient: {}", e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject_line(text))
            .header(header::ContentType::TEXT_PLAIN)
            .body(text.to_string())
            .map_err(|e| AppError::delivery("email", e))
    }
}

/// First non-blank line of the message, clipped.
fn subject_line(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("Catalog update");
    line.chars().take(MAX_SUBJECT_CHARS).collect()
}

#[async_trait]
impl MessageChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, destination: &str, text: &str) -> Result<DeliveryReceipt> {
        let email = self.build_message(destination, text)?;
        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| AppError::delivery(self.name(), e))?;

        Ok(DeliveryReceipt {
            message_id: response.message().next().map(String::from),
        })
    }

    async fn test_connection(&self, _destination: &str) -> Result<()> {
        let reachable = self
            .transport
            .test_connection()
            .await
            .map_err(|e| AppError::delivery(self.name(), e))?;

        if !reachable {
            return Err(AppError::delivery(self.name(), "SMTP server did not respond"));
        }
        Ok(())
    }
}
