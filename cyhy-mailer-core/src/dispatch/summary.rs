use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::category::ReportCategory;

/// Counter bucket: one per report category plus one for broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SummaryKey {
    Report(ReportCategory),
    Adhoc,
}

impl SummaryKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Report(category) => category.as_str(),
            Self::Adhoc => "adhoc",
        }
    }
}

impl fmt::Display for SummaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SummaryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl From<ReportCategory> for SummaryKey {
    fn from(category: ReportCategory) -> Self {
        Self::Report(category)
    }
}

/// Terminal state of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "kebab-case")]
pub enum MessageOutcome {
    Sent,
    Failed(String),
    SkippedNoRecipients(String),
    SkippedDryRun,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub attempted: u64,
    pub sent: u64,
    pub skipped: u64,
    pub failed: u64,
    pub dry_run: u64,
    pub unmatched: u64,
}

impl CategoryCounts {
    fn line(&self, key: SummaryKey) -> String {
        format!(
            "{key}: attempted {}, sent {}, skipped {}, failed {}, dry-run {}, unmatched {}",
            self.attempted, self.sent, self.skipped, self.failed, self.dry_run, self.unmatched
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RunSummary {
    counts: BTreeMap<SummaryKey, CategoryCounts>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `key` appear in the output even when nothing was found for it.
    pub fn touch(&mut self, key: SummaryKey) {
        self.counts.entry(key).or_default();
    }

    /// Count one message that entered the pipeline and ended in `outcome`.
    pub fn record(&mut self, key: SummaryKey, outcome: &MessageOutcome) {
        let counts = self.counts.entry(key).or_default();
        counts.attempted += 1;
        match outcome {
            MessageOutcome::Sent => counts.sent += 1,
            MessageOutcome::Failed(_) => counts.failed += 1,
            MessageOutcome::SkippedNoRecipients(_) => counts.skipped += 1,
            MessageOutcome::SkippedDryRun => counts.dry_run += 1,
        }
    }

    pub fn record_unmatched(&mut self, key: SummaryKey, count: u64) {
        self.counts.entry(key).or_default().unmatched += count;
    }

    pub fn get(&self, key: SummaryKey) -> CategoryCounts {
        self.counts.get(&key).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SummaryKey, CategoryCounts)> + '_ {
        self.counts.iter().map(|(key, counts)| (*key, *counts))
    }

    pub fn totals(&self) -> CategoryCounts {
        self.counts.values().fold(CategoryCounts::default(), |acc, c| CategoryCounts {
            attempted: acc.attempted + c.attempted,
            sent: acc.sent + c.sent,
            skipped: acc.skipped + c.skipped,
            failed: acc.failed + c.failed,
            dry_run: acc.dry_run + c.dry_run,
            unmatched: acc.unmatched + c.unmatched,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.counts.values().any(|counts| counts.failed > 0)
    }

    /// One human-readable line per key, in category order.
    pub fn lines(&self) -> Vec<String> {
        self.counts
            .iter()
            .map(|(key, counts)| counts.line(*key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_land_in_their_counters() {
        let mut summary = RunSummary::new();
        let key = SummaryKey::from(ReportCategory::CyhyReport);
        summary.record(key, &MessageOutcome::Sent);
        summary.record(key, &MessageOutcome::Failed("boom".into()));
        summary.record(key, &MessageOutcome::SkippedNoRecipients("none".into()));
        summary.record(SummaryKey::Adhoc, &MessageOutcome::SkippedDryRun);
        summary.record_unmatched(key, 4);

        assert_eq!(
            summary.get(key),
            CategoryCounts {
                attempted: 3,
                sent: 1,
                skipped: 1,
                failed: 1,
                dry_run: 0,
                unmatched: 4,
            }
        );
        assert_eq!(summary.get(SummaryKey::Adhoc).dry_run, 1);
        assert_eq!(summary.totals().attempted, 4);
        assert!(summary.has_failures());
    }

    #[test]
    fn lines_and_json_use_category_names_in_order() {
        let mut summary = RunSummary::new();
        summary.touch(SummaryKey::Adhoc);
        summary.record(ReportCategory::Notification.into(), &MessageOutcome::Sent);
        summary.touch(ReportCategory::CyhyReport.into());

        let lines = summary.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("cyhy-report: attempted 0"));
        assert!(lines[1].starts_with("notification: attempted 1, sent 1"));
        assert!(lines[2].starts_with("adhoc:"));

        let json = serde_json::to_value(&summary).expect("json");
        assert_eq!(json["notification"]["sent"], 1);
        assert_eq!(json["adhoc"]["attempted"], 0);
        assert!(!summary.has_failures());
    }
}
