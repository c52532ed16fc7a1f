pub mod sources;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use cyhy_mailer_core::{
    AdvisorMap, Audience, CategoryDescriptor, ComposerSettings, MailerError,
    NamingConvention, ReportCategory, SmtpSettings,
};

use crate::validation::ConfigGuardRailError;

pub const DEFAULT_SMTP_SERVER: &str = "localhost";
pub const DEFAULT_SMTP_PORT: u16 = 25;
pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub directory: DirectoryConfig,
    pub mail: MailConfig,
    pub reports: ReportsConfig,
    pub advisors: AdvisorsConfig,
    pub summary: SummaryConfig,
    pub dry_run: bool,
    pub metadata: ConfigMetadata,
}

impl Config {
    /// Where stakeholder records come from. A JSON export wins over the
    /// database so offline dry runs never touch the store.
    pub fn directory_source(&self) -> DirectorySource {
        if let Some(path) = &self.directory.stakeholder_file {
            DirectorySource::File(path.clone())
        } else if let Some(url) = &self.database.url {
            DirectorySource::Database(url.clone())
        } else {
            DirectorySource::None
        }
    }

    /// One descriptor per category, in processing order. Categories
    /// without a directory come back disabled.
    pub fn category_descriptors(
        &self,
    ) -> Result<Vec<CategoryDescriptor>, ConfigGuardRailError> {
        self.reports
            .categories
            .iter()
            .map(|settings| settings.descriptor())
            .collect()
    }

    pub fn enabled_categories(&self) -> Vec<ReportCategory> {
        self.reports
            .categories
            .iter()
            .filter(|settings| settings.directory.is_some())
            .map(|settings| settings.category)
            .collect()
    }

    pub fn load_advisors(&self) -> Result<AdvisorMap, MailerError> {
        match &self.advisors.map_path {
            Some(path) => AdvisorMap::load(path),
            None => Ok(AdvisorMap::disabled()),
        }
    }

    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            server: self.mail.server.clone(),
            port: self.mail.port,
            starttls: self.mail.starttls,
            username: self.mail.username.clone(),
            password: self.mail.password.clone(),
            timeout: self.mail.timeout,
        }
    }

    pub fn composer_settings(&self) -> ComposerSettings {
        let defaults = ComposerSettings::default();
        ComposerSettings {
            from: self.mail.from.clone(),
            cc: self.mail.cc.clone(),
            bcc: self.mail.bcc.clone(),
            report_date: self
                .reports
                .report_date
                .clone()
                .unwrap_or(defaults.report_date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectorySource {
    Database(String),
    File(PathBuf),
    None,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub stakeholder_file: Option<PathBuf>,
    pub batch_size: u32,
}

#[derive(Clone)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub starttls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
    pub from: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("starttls", &self.starttls)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("from", &self.from)
            .field("cc", &self.cc)
            .field("bcc", &self.bcc)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ReportsConfig {
    /// Overrides the current date in report subjects.
    pub report_date: Option<String>,
    pub categories: Vec<CategorySettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySettings {
    pub category: ReportCategory,
    pub directory: Option<PathBuf>,
    pub pattern: Option<String>,
    pub recipients: Option<Vec<String>>,
}

impl CategorySettings {
    pub fn descriptor(&self) -> Result<CategoryDescriptor, ConfigGuardRailError> {
        let mut descriptor =
            CategoryDescriptor::new(self.category, self.directory.clone());
        if let Some(pattern) = &self.pattern {
            descriptor.convention = NamingConvention::new(self.category, pattern)
                .map_err(|source| ConfigGuardRailError::InvalidPattern {
                    category: self.category,
                    source,
                })?;
        }
        if let Some(recipients) = &self.recipients {
            if !matches!(descriptor.audience, Audience::Fixed(_)) {
                return Err(ConfigGuardRailError::UnexpectedRecipients {
                    category: self.category,
                });
            }
            descriptor.audience = Audience::Fixed(recipients.clone());
        }
        Ok(descriptor)
    }
}

#[derive(Debug, Clone)]
pub struct AdvisorsConfig {
    pub map_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub to: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
