//! Report-to-recipient resolution and dispatch for cyhy-mailer.
//!
//! A run scans one directory per enabled [`ReportCategory`], groups the
//! report files by the stakeholder id in their names, resolves each
//! stakeholder's recipients through a [`StakeholderDirectory`], composes a
//! category-specific message and hands it to a [`MailTransport`]. The
//! [`DispatchEngine`] keeps per-category counters and can mail a summary to
//! operators at the end of the run. Ad-hoc broadcasts reuse the same engine
//! with an operator-authored message.

pub mod advisors;
pub mod broadcast;
pub mod category;
pub mod compose;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod locator;
pub mod stakeholder;
pub mod transport;

pub use advisors::AdvisorMap;
pub use broadcast::{AudienceSelector, BroadcastRequest};
pub use category::{
    Audience, CategoryDescriptor, DEFAULT_SCORECARD_RECIPIENTS, NamingConvention,
    ReportCategory,
};
pub use compose::{
    AdhocContent, Attachment, ComposerSettings, MessageComposer, OutboundMessage,
    ResolvedRecipients,
};
#[cfg(feature = "database")]
pub use directory::PostgresStakeholderDirectory;
pub use directory::{
    DirectoryError, InMemoryDirectory, StakeholderDirectory, StakeholderPage,
    stream_stakeholders,
};
pub use dispatch::{
    CategoryCounts, DispatchEngine, DispatchOptions, DispatchRecord, MessageOutcome,
    RunReport, RunSummary, SummaryDelivery, SummaryKey,
};
pub use error::{MailerError, Result};
pub use locator::{LocatedReports, ReportArtifact, ReportGroup, locate};
pub use stakeholder::{
    Contact, InvalidStakeholder, Page, StakeholderFilter, StakeholderKind, StakeholderRecord,
};
#[cfg(feature = "smtp")]
pub use transport::{SmtpMailer, SmtpSettings, parse_address};
pub use transport::{MailTransport, TransportError};
