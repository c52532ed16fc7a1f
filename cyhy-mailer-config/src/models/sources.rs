use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::loader::error::ConfigLoadError;
use crate::util::{parse_bool_var, parse_csv_var, parse_var, path_var};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub directory: FileDirectoryConfig,
    #[serde(default)]
    pub mail: FileMailConfig,
    #[serde(default)]
    pub reports: FileReportsConfig,
    #[serde(default)]
    pub advisors: FileAdvisorsConfig,
    #[serde(default)]
    pub summary: FileSummaryConfig,
    pub dry_run: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDirectoryConfig {
    /// JSON export of the stakeholder collection, used instead of the
    /// database when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stakeholder_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileMailConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starttls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_file: Option<PathBuf>,
    /// humantime syntax, e.g. `"30s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcc: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileReportsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_date: Option<String>,
    #[serde(
        default,
        rename = "cyhy-report",
        skip_serializing_if = "Option::is_none"
    )]
    pub cyhy_report: Option<FileCategoryConfig>,
    #[serde(
        default,
        rename = "trustworthy-mail-report",
        skip_serializing_if = "Option::is_none"
    )]
    pub trustworthy_mail_report: Option<FileCategoryConfig>,
    #[serde(
        default,
        rename = "https-scan-report",
        skip_serializing_if = "Option::is_none"
    )]
    pub https_scan_report: Option<FileCategoryConfig>,
    #[serde(
        default,
        rename = "cybex-scorecard",
        skip_serializing_if = "Option::is_none"
    )]
    pub cybex_scorecard: Option<FileCategoryConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<FileCategoryConfig>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCategoryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Fixed recipient list; only meaningful for the scorecard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileAdvisorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileSummaryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<String>>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub database_url: Option<String>,
    pub database_url_file: Option<PathBuf>,
    pub database_password: Option<String>,
    pub database_password_file: Option<PathBuf>,
    pub stakeholder_file: Option<PathBuf>,
    pub batch_size: Option<u32>,
    pub smtp_server: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_starttls: Option<bool>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_password_file: Option<PathBuf>,
    pub smtp_timeout: Option<String>,
    pub mail_from: Option<String>,
    pub mail_cc: Option<Vec<String>>,
    pub mail_bcc: Option<Vec<String>>,
    pub cyhy_report_dir: Option<PathBuf>,
    pub trustworthy_mail_report_dir: Option<PathBuf>,
    pub https_scan_report_dir: Option<PathBuf>,
    pub cybex_scorecard_dir: Option<PathBuf>,
    pub notification_dir: Option<PathBuf>,
    pub report_date: Option<String>,
    pub advisor_map: Option<PathBuf>,
    pub summary_to: Option<Vec<String>>,
    pub dry_run: Option<bool>,
}

impl EnvConfig {
    /// Read every recognised variable. A variable that is set but cannot be
    /// parsed fails the load instead of silently falling back.
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Ok(Self {
            config_path: path_var("CYHY_MAILER_CONFIG"),
            database_url: std::env::var("DATABASE_URL").ok(),
            database_url_file: path_var("DATABASE_URL_FILE"),
            database_password: std::env::var("DATABASE_PASSWORD").ok(),
            database_password_file: path_var("DATABASE_PASSWORD_FILE"),
            stakeholder_file: path_var("STAKEHOLDER_FILE"),
            batch_size: parse_var("CYHY_MAILER_BATCH_SIZE")?,

            smtp_server: std::env::var("SMTP_SERVER").ok(),
            smtp_port: parse_var("SMTP_PORT")?,
            smtp_starttls: parse_bool_var("SMTP_STARTTLS")?,
            smtp_username: std::env::var("SMTP_USERNAME").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            smtp_password_file: path_var("SMTP_PASSWORD_FILE"),
            smtp_timeout: std::env::var("SMTP_TIMEOUT").ok(),
            mail_from: std::env::var("MAIL_FROM").ok(),
            mail_cc: parse_csv_var("MAIL_CC"),
            mail_bcc: parse_csv_var("MAIL_BCC"),

            cyhy_report_dir: path_var("CYHY_REPORT_DIR"),
            trustworthy_mail_report_dir: path_var("TMAIL_REPORT_DIR"),
            https_scan_report_dir: path_var("HTTPS_REPORT_DIR"),
            cybex_scorecard_dir: path_var("CYBEX_SCORECARD_DIR"),
            notification_dir: path_var("NOTIFICATION_DIR"),
            report_date: std::env::var("REPORT_DATE").ok(),

            advisor_map: path_var("ADVISOR_MAP"),
            summary_to: parse_csv_var("SUMMARY_TO"),
            dry_run: parse_bool_var("DRY_RUN")?,
        })
    }
}

/// Values supplied on the command line; they win over everything else.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub stakeholder_file: Option<PathBuf>,
    pub batch_size: Option<u32>,
    pub cyhy_report_dir: Option<PathBuf>,
    pub trustworthy_mail_report_dir: Option<PathBuf>,
    pub https_scan_report_dir: Option<PathBuf>,
    pub cybex_scorecard_dir: Option<PathBuf>,
    pub notification_dir: Option<PathBuf>,
    pub report_date: Option<String>,
    pub advisor_map: Option<PathBuf>,
    pub summary_to: Option<Vec<String>>,
    pub dry_run: Option<bool>,
}
