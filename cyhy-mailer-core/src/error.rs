use std::path::PathBuf;

use thiserror::Error;

use crate::category::ReportCategory;
use crate::directory::DirectoryError;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("stakeholder directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("failed to read report directory {path}")]
    ReportDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid file naming convention for {category}: {source}")]
    InvalidConvention {
        category: ReportCategory,
        #[source]
        source: regex::Error,
    },

    #[error(
        "file naming convention for {category} has no `id` capture group"
    )]
    MissingIdGroup { category: ReportCategory },

    #[error("invalid advisor map {path}: {reason}")]
    AdvisorMap { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MailerError>;
