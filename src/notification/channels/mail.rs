//! SMTP mail channel.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;
use crate::error::{Error, Result};
use crate::util::read_secret_file;

use super::{NotifyChannel, SendData};

/// Delivers notifications as plain-text mail over SMTP with STARTTLS.
///
/// The SMTP password is read from its file on every send so a rotated
/// credential takes effect without a restart.
pub struct MailChannel {
    config: MailConfig,
}

impl MailChannel {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn mailboxes(&self) -> Result<(Mailbox, Mailbox)> {
        let from = self
            .config
            .from
            .parse::<Mailbox>()
            .map_err(|e| Error::ChannelConfig(format!("mail: invalid from address: {e}")))?;
        let to = self
            .config
            .to
            .parse::<Mailbox>()
            .map_err(|e| Error::ChannelConfig(format!("mail: invalid to address: {e}")))?;
        Ok((from, to))
    }
}

#[async_trait]
impl NotifyChannel for MailChannel {
    fn name(&self) -> &str {
        "mail"
    }

    fn validate(&self) -> Result<()> {
        self.mailboxes()?;

        if self.config.smtp.host.trim().is_empty() {
            return Err(Error::ChannelConfig("mail: smtp host is empty".to_string()));
        }

        // Fail at startup if the password file is unreadable or malformed.
        read_secret_file(&self.config.smtp.password_file)?;
        Ok(())
    }

    async fn send(&self, data: &SendData) -> Result<()> {
        let (from, to) = self.mailboxes()?;
        let password = read_secret_file(&self.config.smtp.password_file)?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(&data.title)
            .header(ContentType::TEXT_PLAIN)
            .body(data.body.clone())
            .map_err(|e| Error::Mail(format!("failed to build message: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp.host)
            .map_err(|e| Error::Mail(format!("failed to build transport: {e}")))?
            .port(self.config.smtp.port)
            .credentials(Credentials::new(
                self.config.smtp.user.clone(),
                password,
            ))
            .build();

        transport
            .send(message)
            .await
            .map_err(|e| Error::Mail(e.to_string()))?;

        Ok(())
    }
}
