//! Message composition: report groups and recipients in, fully addressed
//! [`OutboundMessage`]s out. Nothing here touches the network or reads
//! attachment bytes.

pub mod templates;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::advisors::AdvisorMap;
use crate::locator::ReportGroup;
use crate::stakeholder::{StakeholderRecord, dedupe_addresses};
use templates::{ReportContext, Rendered, render_report, render_summary};

pub const DEFAULT_FROM: &str = "ncats@hq.dhs.gov";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub path: PathBuf,
    pub filename: String,
    pub content_type: String,
}

impl Attachment {
    pub fn from_path(path: &Path) -> Self {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            content_type: content_type_for(path).to_string(),
            filename,
        }
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedRecipients {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub attachments: Vec<Attachment>,
}

impl OutboundMessage {
    /// A message needs at least one `To` address; CC and BCC alone are not
    /// enough to send it.
    pub fn is_addressable(&self) -> bool {
        !self.to.is_empty()
    }

    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }
}

/// Operator-authored content for an ad-hoc broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdhocContent {
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerSettings {
    pub from: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    /// Human-readable date used in report subjects, e.g. "December 12, 2017".
    pub report_date: String,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            from: DEFAULT_FROM.to_string(),
            cc: Vec::new(),
            bcc: Vec::new(),
            report_date: Utc::now().format("%B %d, %Y").to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageComposer {
    settings: ComposerSettings,
}

impl MessageComposer {
    pub fn new(settings: ComposerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ComposerSettings {
        &self.settings
    }

    /// `to` from the record; `cc` is the region advisor (when resolvable)
    /// followed by static CC watchers; `bcc` is static.
    pub fn recipients_for(
        &self,
        record: &StakeholderRecord,
        advisors: Option<&AdvisorMap>,
    ) -> ResolvedRecipients {
        let advisor = advisors.zip(record.region.as_deref()).and_then(
            |(map, region)| map.lookup(region),
        );
        self.addressed(record.notification_addresses(), advisor)
    }

    fn addressed(
        &self,
        to: Vec<String>,
        advisor: Option<&str>,
    ) -> ResolvedRecipients {
        ResolvedRecipients {
            to,
            cc: dedupe_addresses(
                advisor.into_iter().chain(self.settings.cc.iter().map(String::as_str)),
            ),
            bcc: dedupe_addresses(&self.settings.bcc),
        }
    }

    /// Report message for a directory-addressed category. The `to` list may
    /// come back empty; callers treat that as a skip.
    pub fn compose_for_stakeholder(
        &self,
        group: &ReportGroup,
        record: &StakeholderRecord,
        advisors: &AdvisorMap,
    ) -> OutboundMessage {
        let tech_pocs = record.technical_pocs();
        let rendered = render_report(
            group.category,
            &ReportContext {
                acronym: &record.display_name,
                report_date: &self.settings.report_date,
                federal: record.federal,
                kind: record.kind,
                tech_pocs: &tech_pocs,
            },
        );
        let recipients = self.recipients_for(record, Some(advisors));
        self.assemble(recipients, rendered, attachments(group))
    }

    /// Report message for a fixed-audience category; the directory is not
    /// consulted and the file's stakeholder id stands in for the acronym.
    pub fn compose_for_fixed_audience(
        &self,
        group: &ReportGroup,
        to: &[String],
    ) -> OutboundMessage {
        let rendered = render_report(
            group.category,
            &ReportContext {
                acronym: &group.stakeholder_id,
                report_date: &self.settings.report_date,
                federal: false,
                kind: Default::default(),
                tech_pocs: &[],
            },
        );
        let recipients = self.addressed(dedupe_addresses(to), None);
        self.assemble(recipients, rendered, attachments(group))
    }

    /// Ad-hoc message. Advisors are never copied.
    pub fn compose_adhoc(
        &self,
        content: &AdhocContent,
        to: Vec<String>,
    ) -> OutboundMessage {
        let rendered = Rendered {
            subject: content.subject.clone(),
            text_body: content.text_body.clone(),
            html_body: content.html_body.clone(),
        };
        let recipients = self.addressed(dedupe_addresses(to), None);
        self.assemble(recipients, rendered, Vec::new())
    }

    /// Operator summary; sent without static CC watchers.
    pub fn compose_summary(
        &self,
        lines: &[String],
        to: &[String],
        now: DateTime<Utc>,
    ) -> OutboundMessage {
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, false);
        let rendered = render_summary(&timestamp, lines);
        let recipients = ResolvedRecipients {
            to: dedupe_addresses(to),
            cc: Vec::new(),
            bcc: Vec::new(),
        };
        self.assemble(recipients, rendered, Vec::new())
    }

    fn assemble(
        &self,
        recipients: ResolvedRecipients,
        rendered: Rendered,
        attachments: Vec<Attachment>,
    ) -> OutboundMessage {
        OutboundMessage {
            from: self.settings.from.clone(),
            to: recipients.to,
            cc: recipients.cc,
            bcc: recipients.bcc,
            subject: rendered.subject,
            text_body: rendered.text_body,
            html_body: rendered.html_body,
            attachments,
        }
    }
}

fn attachments(group: &ReportGroup) -> Vec<Attachment> {
    group
        .artifacts
        .iter()
        .map(|artifact| Attachment::from_path(&artifact.path))
        .collect()
}
