//! Dispatch engine: drives each enabled category from located report
//! groups to transport calls and keeps the run summary.
//!
//! Every message follows the same one-way path:
//!
//! ```text
//! PENDING -> SKIPPED(no-recipients)
//!         -> READY -> SKIPPED(dry-run) | SENT | FAILED
//! ```
//!
//! Failures stay confined to the message that hit them; only a directory
//! that stops answering ends the run early.

mod summary;

pub use summary::{CategoryCounts, MessageOutcome, RunSummary, SummaryKey};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{TryStreamExt, pin_mut};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::advisors::AdvisorMap;
use crate::category::{Audience, CategoryDescriptor};
use crate::compose::{MessageComposer, OutboundMessage};
use crate::directory::{StakeholderDirectory, stream_stakeholders};
use crate::error::Result;
use crate::locator::{LocatedReports, ReportGroup, locate};
use crate::stakeholder::StakeholderFilter;
use crate::transport::MailTransport;

pub const DEFAULT_BATCH_SIZE: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    pub dry_run: bool,
    /// Records fetched per directory round trip.
    pub batch_size: u32,
    /// Operators who receive the end-of-run summary.
    pub summary_to: Vec<String>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            batch_size: DEFAULT_BATCH_SIZE,
            summary_to: Vec::new(),
        }
    }
}

/// Journal entry for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchRecord {
    pub key: SummaryKey,
    pub stakeholder_id: Option<String>,
    pub subject: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub attachments: usize,
    pub outcome: MessageOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "kebab-case")]
pub enum SummaryDelivery {
    NotConfigured,
    SkippedDryRun,
    Sent,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub messages: Vec<DispatchRecord>,
    pub summary_email: SummaryDelivery,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.summary.has_failures()
    }
}

pub struct DispatchEngine {
    directory: Arc<dyn StakeholderDirectory>,
    transport: Arc<dyn MailTransport>,
    composer: MessageComposer,
    advisors: AdvisorMap,
    options: DispatchOptions,
    summary: RunSummary,
    journal: Vec<DispatchRecord>,
}

impl std::fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("options", &self.options)
            .field("advisors", &self.advisors.len())
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl DispatchEngine {
    pub fn new(
        directory: Arc<dyn StakeholderDirectory>,
        transport: Arc<dyn MailTransport>,
        composer: MessageComposer,
        advisors: AdvisorMap,
        options: DispatchOptions,
    ) -> Self {
        Self {
            directory,
            transport,
            composer,
            advisors,
            options,
            summary: RunSummary::new(),
            journal: Vec::new(),
        }
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    pub(crate) fn directory(&self) -> &Arc<dyn StakeholderDirectory> {
        &self.directory
    }

    pub(crate) fn composer(&self) -> &MessageComposer {
        &self.composer
    }

    pub(crate) fn summary_touch(&mut self, key: SummaryKey) {
        self.summary.touch(key);
    }

    /// Run every enabled category in order. All directories are scanned
    /// before the first send so an unreadable one stops the run cleanly.
    pub async fn run_categories(
        &mut self,
        descriptors: &[CategoryDescriptor],
    ) -> Result<()> {
        let mut located = Vec::new();
        for descriptor in descriptors.iter().filter(|d| d.is_enabled()) {
            located.push((descriptor, locate(descriptor).await?));
        }
        for (descriptor, reports) in located {
            self.run_category(descriptor, reports).await?;
        }
        Ok(())
    }

    pub async fn run_category(
        &mut self,
        descriptor: &CategoryDescriptor,
        reports: LocatedReports,
    ) -> Result<()> {
        let key = SummaryKey::from(descriptor.category);
        self.summary.touch(key);
        info!(
            category = %descriptor.category,
            groups = reports.groups.len(),
            skipped_files = reports.skipped_files.len(),
            dry_run = self.options.dry_run,
            "dispatching category"
        );

        for group in &reports.groups {
            self.dispatch_group(descriptor, group).await?;
        }

        if descriptor.coverage_checked {
            self.check_coverage(descriptor, &reports).await?;
        }

        let counts = self.summary.get(key);
        info!(
            category = %descriptor.category,
            attempted = counts.attempted,
            sent = counts.sent,
            skipped = counts.skipped,
            failed = counts.failed,
            dry_run = counts.dry_run,
            unmatched = counts.unmatched,
            "category complete"
        );
        Ok(())
    }

    async fn dispatch_group(
        &mut self,
        descriptor: &CategoryDescriptor,
        group: &ReportGroup,
    ) -> Result<()> {
        let key = SummaryKey::from(descriptor.category);
        let id = group.stakeholder_id.as_str();

        let message = match &descriptor.audience {
            Audience::Fixed(to) => {
                self.composer.compose_for_fixed_audience(group, to)
            }
            Audience::Directory => match self.directory.get(id).await {
                Ok(Some(record)) => self.composer.compose_for_stakeholder(
                    group,
                    &record,
                    &self.advisors,
                ),
                Ok(None) => {
                    self.skip(key, Some(id), "stakeholder not found in directory");
                    return Ok(());
                }
                Err(err) if err.is_record_level() => {
                    self.skip(key, Some(id), &err.to_string());
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            },
        };

        if !message.is_addressable() {
            self.skip(key, Some(id), "no usable recipient addresses");
            return Ok(());
        }

        self.deliver(key, Some(id), message).await;
        Ok(())
    }

    /// Count active stakeholders that have no report in this pass.
    async fn check_coverage(
        &mut self,
        descriptor: &CategoryDescriptor,
        reports: &LocatedReports,
    ) -> Result<()> {
        let found: HashSet<&str> = reports.stakeholder_ids().collect();
        let directory = Arc::clone(&self.directory);
        let stream = stream_stakeholders(
            directory.as_ref(),
            StakeholderFilter::all(),
            self.options.batch_size,
        );
        pin_mut!(stream);

        let mut unmatched = 0u64;
        while let Some(record) = stream.try_next().await? {
            if !found.contains(record.id.as_str()) {
                debug!(
                    category = %descriptor.category,
                    stakeholder = %record.id,
                    "no report found for active stakeholder"
                );
                unmatched += 1;
            }
        }

        if unmatched > 0 {
            warn!(
                category = %descriptor.category,
                unmatched,
                "active stakeholders without a report"
            );
        }
        self.summary
            .record_unmatched(descriptor.category.into(), unmatched);
        Ok(())
    }

    /// PENDING -> SKIPPED(no-recipients).
    pub(crate) fn skip(&mut self, key: SummaryKey, stakeholder_id: Option<&str>, reason: &str) {
        warn!(
            category = %key,
            stakeholder = stakeholder_id.unwrap_or("-"),
            reason,
            "message skipped"
        );
        let outcome = MessageOutcome::SkippedNoRecipients(reason.to_string());
        self.summary.record(key, &outcome);
        self.journal.push(DispatchRecord {
            key,
            stakeholder_id: stakeholder_id.map(str::to_string),
            subject: None,
            to: Vec::new(),
            cc: Vec::new(),
            attachments: 0,
            outcome,
        });
    }

    /// READY -> SKIPPED(dry-run) | SENT | FAILED.
    pub(crate) async fn deliver(
        &mut self,
        key: SummaryKey,
        stakeholder_id: Option<&str>,
        message: OutboundMessage,
    ) -> MessageOutcome {
        let stakeholder = stakeholder_id.unwrap_or("-");
        let outcome = if self.options.dry_run {
            info!(
                category = %key,
                stakeholder,
                to = ?message.to,
                cc = ?message.cc,
                attachments = message.attachments.len(),
                subject = %message.subject,
                "dry run: would send"
            );
            MessageOutcome::SkippedDryRun
        } else {
            match self.transport.send(&message).await {
                Ok(()) => {
                    info!(
                        category = %key,
                        stakeholder,
                        recipients = message.recipient_count(),
                        "message sent"
                    );
                    MessageOutcome::Sent
                }
                Err(err) => {
                    error!(
                        category = %key,
                        stakeholder,
                        error = %err,
                        "message failed"
                    );
                    MessageOutcome::Failed(err.to_string())
                }
            }
        };

        self.summary.record(key, &outcome);
        self.journal.push(DispatchRecord {
            key,
            stakeholder_id: stakeholder_id.map(str::to_string),
            subject: Some(message.subject),
            to: message.to,
            cc: message.cc,
            attachments: message.attachments.len(),
            outcome: outcome.clone(),
        });
        outcome
    }

    /// Release the directory without mailing a summary. For runs stopped by
    /// a fatal error.
    pub async fn close(self) {
        self.directory.close().await;
    }

    /// Mail the summary to operators, release the directory and hand back
    /// the report. A failed summary send is logged only.
    pub async fn finish(self) -> RunReport {
        let finished_at = Utc::now();
        let summary_email = if self.options.summary_to.is_empty() {
            SummaryDelivery::NotConfigured
        } else {
            let message = self.composer.compose_summary(
                &self.summary.lines(),
                &self.options.summary_to,
                finished_at,
            );
            if self.options.dry_run {
                info!(to = ?message.to, "dry run: would send summary");
                SummaryDelivery::SkippedDryRun
            } else {
                match self.transport.send(&message).await {
                    Ok(()) => {
                        info!(to = ?message.to, "summary sent");
                        SummaryDelivery::Sent
                    }
                    Err(err) => {
                        error!(error = %err, "failed to send run summary");
                        SummaryDelivery::Failed(err.to_string())
                    }
                }
            }
        };

        self.directory.close().await;

        RunReport {
            summary: self.summary,
            messages: self.journal,
            summary_email,
            finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::ComposerSettings;
    use crate::directory::InMemoryDirectory;
    use crate::transport::{MockMailTransport, TransportError};

    fn engine(transport: MockMailTransport, options: DispatchOptions) -> DispatchEngine {
        DispatchEngine::new(
            Arc::new(InMemoryDirectory::default()),
            Arc::new(transport),
            MessageComposer::new(ComposerSettings {
                from: "reports@x.gov".into(),
                cc: Vec::new(),
                bcc: Vec::new(),
                report_date: "January 2, 2024".into(),
            }),
            AdvisorMap::disabled(),
            options,
        )
    }

    #[tokio::test]
    async fn summary_is_mailed_to_operators() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|message| message.to == vec!["ops@x.gov".to_string()] && message.cc.is_empty())
            .times(1)
            .returning(|_| Ok(()));

        let report = engine(
            transport,
            DispatchOptions {
                summary_to: vec!["ops@x.gov".into()],
                ..DispatchOptions::default()
            },
        )
        .finish()
        .await;

        assert_eq!(report.summary_email, SummaryDelivery::Sent);
        assert!(report.messages.is_empty());
    }

    #[tokio::test]
    async fn failed_summary_does_not_count_as_a_message_failure() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(TransportError::Smtp("421 try later".into())));

        let report = engine(
            transport,
            DispatchOptions {
                summary_to: vec!["ops@x.gov".into()],
                ..DispatchOptions::default()
            },
        )
        .finish()
        .await;

        assert!(matches!(report.summary_email, SummaryDelivery::Failed(_)));
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn dry_run_suppresses_the_summary() {
        let mut transport = MockMailTransport::new();
        transport.expect_send().times(0);

        let report = engine(
            transport,
            DispatchOptions {
                dry_run: true,
                summary_to: vec!["ops@x.gov".into()],
                ..DispatchOptions::default()
            },
        )
        .finish()
        .await;

        assert_eq!(report.summary_email, SummaryDelivery::SkippedDryRun);
    }

    #[tokio::test]
    async fn no_summary_recipients_means_no_summary() {
        let mut transport = MockMailTransport::new();
        transport.expect_send().times(0);

        let report = engine(transport, DispatchOptions::default()).finish().await;
        assert_eq!(report.summary_email, SummaryDelivery::NotConfigured);
    }
}
