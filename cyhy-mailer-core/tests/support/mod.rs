#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cyhy_mailer_core::{
    AdvisorMap, ComposerSettings, Contact, DirectoryError, DispatchEngine, DispatchOptions,
    InMemoryDirectory, MailTransport, MessageComposer, OutboundMessage, Page,
    StakeholderDirectory, StakeholderFilter, StakeholderKind, StakeholderPage,
    StakeholderRecord, TransportError,
};

/// Transport that records every message and fails those addressed to a
/// configured set of recipients.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutboundMessage>>,
    failing: HashSet<String>,
}

impl RecordingTransport {
    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().expect("transport lock").clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        if message.to.iter().any(|to| self.failing.contains(to)) {
            return Err(TransportError::Smtp("550 mailbox unavailable".into()));
        }
        self.sent.lock().expect("transport lock").push(message.clone());
        Ok(())
    }
}

/// Directory that loses its connection on the `fail_on`-th lookup (1-based)
/// and remembers whether it was closed.
#[derive(Debug)]
pub struct FailingDirectory {
    inner: InMemoryDirectory,
    fail_on: usize,
    lookups: AtomicUsize,
    closed: AtomicBool,
}

impl FailingDirectory {
    pub fn new(records: Vec<StakeholderRecord>, fail_on: usize) -> Self {
        Self {
            inner: InMemoryDirectory::new(records),
            fail_on,
            lookups: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StakeholderDirectory for FailingDirectory {
    async fn get(&self, id: &str) -> Result<Option<StakeholderRecord>, DirectoryError> {
        let lookup = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
        if lookup >= self.fail_on {
            return Err(DirectoryError::Unavailable("connection reset by peer".into()));
        }
        self.inner.get(id).await
    }

    async fn list(
        &self,
        filter: &StakeholderFilter,
        page: Page,
    ) -> Result<StakeholderPage, DirectoryError> {
        self.inner.list(filter, page).await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn stakeholder(id: &str, federal: bool, technical: &[&str], distro: &[&str]) -> StakeholderRecord {
    StakeholderRecord {
        id: id.into(),
        display_name: format!("ORG{id}"),
        name: None,
        federal,
        region: None,
        kind: if federal {
            StakeholderKind::Federal
        } else {
            StakeholderKind::State
        },
        technical_contacts: technical
            .iter()
            .map(|email| Contact {
                name: None,
                email: (*email).to_string(),
            })
            .collect(),
        distribution_lists: distro.iter().map(|s| s.to_string()).collect(),
        retired: false,
    }
}

pub fn settings() -> ComposerSettings {
    ComposerSettings {
        from: "reports@x.gov".into(),
        cc: Vec::new(),
        bcc: Vec::new(),
        report_date: "January 2, 2024".into(),
    }
}

pub fn advisors() -> AdvisorMap {
    AdvisorMap::from_entries(Path::new("advisors.toml"), [("VA", "c@x.gov")])
        .expect("advisor map")
}

pub fn engine(
    records: Vec<StakeholderRecord>,
    transport: Arc<dyn MailTransport>,
    advisors: AdvisorMap,
    options: DispatchOptions,
) -> DispatchEngine {
    DispatchEngine::new(
        Arc::new(InMemoryDirectory::new(records)),
        transport,
        MessageComposer::new(settings()),
        advisors,
        options,
    )
}

pub fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"%PDF-1.4 fixture").expect("write report fixture");
}
