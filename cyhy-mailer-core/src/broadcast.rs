//! Ad-hoc broadcast: one operator-authored message fanned out to explicit
//! addresses and/or directory stakeholders.

use std::collections::HashSet;
use std::sync::Arc;

use futures::{TryStreamExt, pin_mut};
use tracing::info;

use crate::compose::AdhocContent;
use crate::directory::stream_stakeholders;
use crate::dispatch::{DispatchEngine, SummaryKey};
use crate::error::Result;
use crate::stakeholder::{StakeholderFilter, dedupe_addresses};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudienceSelector {
    pub addresses: Vec<String>,
    pub all_stakeholders: bool,
    pub federal_stakeholders: bool,
}

impl AudienceSelector {
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && !self.all_stakeholders && !self.federal_stakeholders
    }

    /// Directory filter covering the union of the two stakeholder flags.
    /// Federal stakeholders are a subset of all stakeholders.
    pub fn stakeholder_filter(&self) -> Option<StakeholderFilter> {
        if self.all_stakeholders {
            Some(StakeholderFilter::all())
        } else if self.federal_stakeholders {
            Some(StakeholderFilter::federal())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRequest {
    pub content: AdhocContent,
    pub audience: AudienceSelector,
}

/// Addresses already handed to a message earlier in the same broadcast.
#[derive(Debug, Default)]
struct SeenAddresses(HashSet<String>);

impl SeenAddresses {
    fn unseen(&self, addresses: Vec<String>) -> Vec<String> {
        addresses
            .into_iter()
            .filter(|address| !self.0.contains(address))
            .collect()
    }

    fn mark(&mut self, addresses: &[String]) {
        self.0.extend(addresses.iter().cloned());
    }
}

impl DispatchEngine {
    /// Explicit addresses go first as a single message, then one message
    /// per selected stakeholder in id order. An address only ever receives
    /// the broadcast once.
    pub async fn run_broadcast(&mut self, request: &BroadcastRequest) -> Result<()> {
        let key = SummaryKey::Adhoc;
        self.summary_touch(key);
        let mut seen = SeenAddresses::default();

        if !request.audience.addresses.is_empty() {
            let to = dedupe_addresses(&request.audience.addresses);
            self.broadcast_one(&request.content, None, to, &mut seen).await;
        }

        if let Some(filter) = request.audience.stakeholder_filter() {
            let directory = Arc::clone(self.directory());
            let stream =
                stream_stakeholders(directory.as_ref(), filter, self.options().batch_size);
            pin_mut!(stream);
            while let Some(record) = stream.try_next().await? {
                let to = record.notification_addresses();
                self.broadcast_one(&request.content, Some(&record.id), to, &mut seen)
                    .await;
            }
        }

        let counts = self.summary().get(key);
        info!(
            attempted = counts.attempted,
            sent = counts.sent,
            skipped = counts.skipped,
            failed = counts.failed,
            dry_run = counts.dry_run,
            "broadcast complete"
        );
        Ok(())
    }

    async fn broadcast_one(
        &mut self,
        content: &AdhocContent,
        stakeholder_id: Option<&str>,
        addresses: Vec<String>,
        seen: &mut SeenAddresses,
    ) {
        let key = SummaryKey::Adhoc;
        if addresses.is_empty() {
            self.skip(key, stakeholder_id, "no usable recipient addresses");
            return;
        }
        let to = seen.unseen(addresses);
        if to.is_empty() {
            self.skip(key, stakeholder_id, "every address already received this broadcast");
            return;
        }

        let message = self.composer().compose_adhoc(content, to);
        seen.mark(&message.to);
        self.deliver(key, stakeholder_id, message).await;
    }
}
