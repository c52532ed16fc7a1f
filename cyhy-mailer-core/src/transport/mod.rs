//! Mail transport port. Adapters deliver one [`OutboundMessage`] per call
//! and report failures for that message only.

#[cfg(feature = "smtp")]
mod smtp;

#[cfg(feature = "smtp")]
pub use smtp::{SmtpMailer, SmtpSettings, build_message};

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::compose::OutboundMessage;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to read attachment {path}: {reason}")]
    Attachment { path: PathBuf, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// Parse a bare mailbox address such as `ops@example.gov`, with the same
/// rules the SMTP transport applies when it builds a message.
#[cfg(feature = "smtp")]
pub fn parse_address(raw: &str) -> Result<lettre::Address, lettre::address::AddressError> {
    raw.parse()
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}
