use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use super::{MailTransport, TransportError};
use crate::compose::OutboundMessage;

#[derive(Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub starttls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("starttls", &self.starttls)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            server: "localhost".into(),
            port: 25,
            starttls: false,
            username: None,
            password: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// SMTP delivery through lettre's tokio transport.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    server: String,
}

impl fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, TransportError> {
        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
                .map_err(|e| TransportError::Smtp(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.server)
        };

        let mut builder = builder
            .port(settings.port)
            .timeout(Some(settings.timeout));
        if let Some(username) = &settings.username {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                settings.password.clone().unwrap_or_default(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            server: format!("{}:{}", settings.server, settings.port),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let email = build_message(message).await?;
        self.transport
            .send(email)
            .await
            .map_err(|e| TransportError::Smtp(e.to_string()))?;
        debug!(server = %self.server, subject = %message.subject, "message relayed");
        Ok(())
    }
}

fn mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address
        .parse()
        .map_err(|_| TransportError::InvalidAddress(address.to_string()))
}

/// Build the MIME message: a text/HTML alternative part followed by one
/// part per attachment, read from disk unmodified.
pub async fn build_message(message: &OutboundMessage) -> Result<Message, TransportError> {
    let mut builder = Message::builder()
        .from(mailbox(&message.from)?)
        .subject(message.subject.clone());
    for address in &message.to {
        builder = builder.to(mailbox(address)?);
    }
    for address in &message.cc {
        builder = builder.cc(mailbox(address)?);
    }
    for address in &message.bcc {
        builder = builder.bcc(mailbox(address)?);
    }

    let mut body = MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
        message.text_body.clone(),
        message.html_body.clone(),
    ));
    for attachment in &message.attachments {
        let bytes = tokio::fs::read(&attachment.path).await.map_err(|e| {
            TransportError::Attachment {
                path: attachment.path.clone(),
                reason: e.to_string(),
            }
        })?;
        let content_type = ContentType::parse(&attachment.content_type)
            .map_err(|e| TransportError::Build(e.to_string()))?;
        body = body.singlepart(
            Attachment::new(attachment.filename.clone()).body(bytes, content_type),
        );
    }

    builder
        .multipart(body)
        .map_err(|e| TransportError::Build(e.to_string()))
}
