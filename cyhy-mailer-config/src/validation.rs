use cyhy_mailer_core::{Audience, MailerError, ReportCategory, parse_address};
use thiserror::Error;

use super::models::{Config, DirectorySource};

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("invalid file naming pattern for {category}")]
    InvalidPattern {
        category: ReportCategory,
        #[source]
        source: MailerError,
    },
    #[error("{category} is addressed from the directory; `recipients` is not allowed")]
    UnexpectedRecipients { category: ReportCategory },
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("no report category enabled and no broadcast requested")]
    NothingToDo,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    // Surface bad patterns before anything is scanned.
    let descriptors = config.category_descriptors()?;

    if config.directory.batch_size == 0 {
        return Err(ConfigGuardRailError::InvalidValue {
            field: "batch_size",
            reason: "must be at least 1".into(),
        });
    }

    if config.mail.port == 0 {
        return Err(ConfigGuardRailError::InvalidValue {
            field: "SMTP_PORT",
            reason: "must be between 1 and 65535".into(),
        });
    }

    validate_address("MAIL_FROM", &config.mail.from)?;
    for address in config.mail.cc.iter().chain(&config.mail.bcc) {
        validate_address("MAIL_CC/MAIL_BCC", address)?;
    }
    for address in &config.summary.to {
        validate_address("SUMMARY_TO", address)?;
    }
    for descriptor in descriptors.iter().filter(|d| d.is_enabled()) {
        if let Audience::Fixed(recipients) = &descriptor.audience {
            for address in recipients {
                validate_address("recipients", address)?;
            }
        }
    }

    if config.mail.username.is_some() && config.mail.password.is_none() {
        warnings.push_with_hint(
            "SMTP_USERNAME set without a password",
            "Set SMTP_PASSWORD or SMTP_PASSWORD_FILE",
        );
    }
    if config.mail.username.is_some() && !config.mail.starttls {
        warnings.push_with_hint(
            "SMTP credentials will be sent without STARTTLS",
            "Set SMTP_STARTTLS=true when the relay supports it",
        );
    }

    if config.directory.stakeholder_file.is_some() && config.database.url.is_some() {
        warnings.push(
            "Both a stakeholder file and a database are configured; using the stakeholder file",
        );
    }
    if config.directory_source() == DirectorySource::None {
        warnings.push_with_hint(
            "No stakeholder directory configured",
            "Set DATABASE_URL or STAKEHOLDER_FILE; only the scorecard can be sent without one",
        );
    }

    if config.advisors.map_path.is_none() {
        warnings.push_with_hint(
            "Region advisor map not configured; advisors will not be copied",
            "Set ADVISOR_MAP or [advisors] map to enable advisor CC",
        );
    }

    Ok(warnings)
}

/// Fails when no category has a directory and no broadcast was requested.
pub fn require_enabled_category(
    config: &Config,
    broadcast_requested: bool,
) -> Result<(), ConfigGuardRailError> {
    if config.enabled_categories().is_empty() && !broadcast_requested {
        return Err(ConfigGuardRailError::NothingToDo);
    }
    Ok(())
}

fn validate_address(
    field: &'static str,
    address: &str,
) -> Result<(), ConfigGuardRailError> {
    parse_address(address)
        .map(drop)
        .map_err(|err| ConfigGuardRailError::InvalidValue {
            field,
            reason: format!("'{address}' is not an email address ({err})"),
        })
}
