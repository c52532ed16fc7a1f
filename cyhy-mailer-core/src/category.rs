//! Report categories and the descriptors that switch them on for a run.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MailerError, Result};

/// Scorecard mailboxes that receive the Cyber Exposure scorecard when no
/// recipient list is configured for that category.
pub const DEFAULT_SCORECARD_RECIPIENTS: [&str; 4] = [
    "CyHy_Reports@hq.dhs.gov",
    "CyberDirectives@cisa.dhs.gov",
    "CyberLiaison@cisa.dhs.gov",
    "cyberscopehelp@cisa.dhs.gov",
];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ReportCategory {
    CyhyReport,
    TrustworthyMailReport,
    HttpsScanReport,
    CybexScorecard,
    Notification,
}

impl ReportCategory {
    /// Processing order for a run.
    pub const ALL: [ReportCategory; 5] = [
        ReportCategory::CyhyReport,
        ReportCategory::TrustworthyMailReport,
        ReportCategory::HttpsScanReport,
        ReportCategory::CybexScorecard,
        ReportCategory::Notification,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CyhyReport => "cyhy-report",
            Self::TrustworthyMailReport => "trustworthy-mail-report",
            Self::HttpsScanReport => "https-scan-report",
            Self::CybexScorecard => "cybex-scorecard",
            Self::Notification => "notification",
        }
    }

    pub fn default_pattern(self) -> &'static str {
        match self {
            Self::CyhyReport => r"^(?P<id>[^_]+)_cyhy_report(?:_[^.]+)?\.pdf$",
            Self::TrustworthyMailReport => {
                r"^(?P<id>[^_]+)_trustworthy_email_report(?:_[^.]+)?\.pdf$"
            }
            Self::HttpsScanReport => {
                r"^(?P<id>[^_]+)_https_report(?:_[^.]+)?\.pdf$"
            }
            Self::CybexScorecard => {
                r"^(?P<id>[^_]+)_cybex_scorecard(?:_[^.]+)?\.(?:pdf|csv)$"
            }
            Self::Notification => {
                r"^(?P<id>[^_]+)_cyhy_notification(?:_[^.]+)?\.pdf$"
            }
        }
    }

    /// Periodic reports are expected for every active stakeholder, so runs
    /// log the stakeholders that have none.
    pub fn default_coverage_check(self) -> bool {
        matches!(
            self,
            Self::CyhyReport | Self::TrustworthyMailReport | Self::HttpsScanReport
        )
    }

    pub fn default_audience(self) -> Audience {
        match self {
            Self::CybexScorecard => Audience::Fixed(
                DEFAULT_SCORECARD_RECIPIENTS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            _ => Audience::Directory,
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ReportCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s.trim())
            .ok_or_else(|| format!("unknown report category '{s}'"))
    }
}

/// File-name convention: a regular expression with a named `id` group
/// marking where the stakeholder id sits.
#[derive(Debug, Clone)]
pub struct NamingConvention {
    regex: Regex,
}

impl NamingConvention {
    pub fn new(category: ReportCategory, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| {
            MailerError::InvalidConvention { category, source }
        })?;
        if !regex.capture_names().flatten().any(|name| name == "id") {
            return Err(MailerError::MissingIdGroup { category });
        }
        Ok(Self { regex })
    }

    pub fn default_for(category: ReportCategory) -> Self {
        Self {
            regex: Regex::new(category.default_pattern())
                .expect("built-in naming patterns compile"),
        }
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Stakeholder id embedded in `file_name`, if the name follows the
    /// convention.
    pub fn stakeholder_id(&self, file_name: &str) -> Option<String> {
        let captures = self.regex.captures(file_name)?;
        let id = captures.name("id")?.as_str().trim();
        (!id.is_empty()).then(|| id.to_string())
    }
}

/// Who receives a category's messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Contacts of the stakeholder named in the file.
    Directory,
    /// A fixed list, regardless of the stakeholder in the file name.
    Fixed(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct CategoryDescriptor {
    pub category: ReportCategory,
    /// `None` disables the category for the run.
    pub directory: Option<PathBuf>,
    pub convention: NamingConvention,
    pub audience: Audience,
    pub coverage_checked: bool,
}

impl CategoryDescriptor {
    /// Descriptor with the built-in convention, audience and coverage
    /// policy for `category`.
    pub fn new(category: ReportCategory, directory: Option<PathBuf>) -> Self {
        Self {
            category,
            directory,
            convention: NamingConvention::default_for(category),
            audience: category.default_audience(),
            coverage_checked: category.default_coverage_check(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.directory.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_patterns_compile_with_id_group() {
        for category in ReportCategory::ALL {
            NamingConvention::new(category, category.default_pattern())
                .expect("default pattern is valid");
        }
    }

    #[test]
    fn cyhy_convention_extracts_id_from_multipart_names() {
        let convention = NamingConvention::default_for(ReportCategory::CyhyReport);
        assert_eq!(
            convention.stakeholder_id("12345_cyhy_report.pdf").as_deref(),
            Some("12345")
        );
        assert_eq!(
            convention.stakeholder_id("12345_cyhy_report_p2.pdf").as_deref(),
            Some("12345")
        );
        assert_eq!(convention.stakeholder_id("12345_cyhy_report.txt"), None);
        assert_eq!(convention.stakeholder_id("cyhy-12345-2024.pdf"), None);
    }

    #[test]
    fn scorecard_convention_accepts_csv() {
        let convention =
            NamingConvention::default_for(ReportCategory::CybexScorecard);
        assert_eq!(
            convention
                .stakeholder_id("CISA_cybex_scorecard_urgent_open.csv")
                .as_deref(),
            Some("CISA")
        );
    }

    #[test]
    fn custom_convention_requires_id_group() {
        let err = NamingConvention::new(ReportCategory::CyhyReport, r"^cyhy-(.+)\.pdf$")
            .expect_err("missing id group");
        assert!(matches!(err, MailerError::MissingIdGroup { .. }));

        let convention = NamingConvention::new(
            ReportCategory::CyhyReport,
            r"^cyhy-(?P<id>[^-]+)-.*\.pdf$",
        )
        .expect("valid pattern");
        assert_eq!(
            convention.stakeholder_id("cyhy-DHS-2018-01-01.pdf").as_deref(),
            Some("DHS")
        );
    }

    #[test]
    fn invalid_regex_is_reported() {
        let err = NamingConvention::new(ReportCategory::Notification, "(?P<id>")
            .expect_err("bad regex");
        assert!(matches!(err, MailerError::InvalidConvention { .. }));
    }

    #[test]
    fn category_names_round_trip_through_from_str() {
        for category in ReportCategory::ALL {
            assert_eq!(category.as_str().parse::<ReportCategory>(), Ok(category));
        }
        assert!("adhoc".parse::<ReportCategory>().is_err());
    }

    #[test]
    fn scorecard_defaults_to_fixed_audience() {
        let descriptor = CategoryDescriptor::new(ReportCategory::CybexScorecard, None);
        assert!(!descriptor.is_enabled());
        assert!(matches!(descriptor.audience, Audience::Fixed(ref to) if to.len() == 4));
        assert!(!descriptor.coverage_checked);
    }
}
