//! Recipient directory port and its adapters.
//!
//! The engine only ever reads stakeholder records: by id during per-report
//! dispatch, and in id-ordered batches for coverage checks and broadcast
//! audiences. Adapters validate records at this boundary so the rest of the
//! crate works with typed [`StakeholderRecord`]s.

mod memory;
#[cfg(feature = "database")]
mod postgres;

pub use memory::InMemoryDirectory;
#[cfg(feature = "database")]
pub use postgres::PostgresStakeholderDirectory;

use std::path::PathBuf;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::stakeholder::{InvalidStakeholder, Page, StakeholderFilter, StakeholderRecord};

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("stakeholder store unavailable: {0}")]
    Unavailable(String),

    #[error("stakeholder query failed: {0}")]
    Query(String),

    #[error("stakeholder {id} has an invalid record: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("failed to read stakeholder file {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse stakeholder file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DirectoryError {
    /// Errors confined to a single record; everything else means the store
    /// itself cannot be trusted for the rest of the run.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::InvalidRecord { .. })
    }

    pub fn invalid_record(id: impl Into<String>, reason: InvalidStakeholder) -> Self {
        Self::InvalidRecord {
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}

/// One keyset page of a bulk query.
#[derive(Debug, Clone, Default)]
pub struct StakeholderPage {
    pub records: Vec<StakeholderRecord>,
    /// Cursor for the next page; `None` once the population is exhausted.
    pub next_after: Option<String>,
}

#[async_trait]
pub trait StakeholderDirectory: Send + Sync {
    /// `Ok(None)` means the id is unknown, which is distinct from a record
    /// with no usable contacts.
    async fn get(
        &self,
        id: &str,
    ) -> Result<Option<StakeholderRecord>, DirectoryError>;

    /// Records matching `filter`, ordered by id.
    async fn list(
        &self,
        filter: &StakeholderFilter,
        page: Page,
    ) -> Result<StakeholderPage, DirectoryError>;

    /// Release the underlying handle at the end of a run.
    async fn close(&self) {}
}

/// Lazily walk every record matching `filter`, fetching `batch_size`
/// records per round trip.
pub fn stream_stakeholders(
    directory: &dyn StakeholderDirectory,
    filter: StakeholderFilter,
    batch_size: u32,
) -> impl Stream<Item = Result<StakeholderRecord, DirectoryError>> + '_ {
    async_stream::try_stream! {
        let mut page = Page::first(batch_size);
        loop {
            let StakeholderPage { records, next_after } =
                directory.list(&filter, page.clone()).await?;
            for record in records {
                yield record;
            }
            match next_after {
                Some(after) => page.after = Some(after),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::TryStreamExt;

    use super::*;
    use crate::stakeholder::StakeholderKind;

    fn record(id: &str, federal: bool) -> StakeholderRecord {
        StakeholderRecord {
            id: id.into(),
            display_name: id.to_uppercase(),
            name: None,
            federal,
            region: None,
            kind: if federal {
                StakeholderKind::Federal
            } else {
                StakeholderKind::State
            },
            technical_contacts: Vec::new(),
            distribution_lists: vec![format!("{id}@x.gov")],
            retired: false,
        }
    }

    struct CountingDirectory {
        inner: InMemoryDirectory,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StakeholderDirectory for CountingDirectory {
        async fn get(
            &self,
            id: &str,
        ) -> Result<Option<StakeholderRecord>, DirectoryError> {
            self.inner.get(id).await
        }

        async fn list(
            &self,
            filter: &StakeholderFilter,
            page: Page,
        ) -> Result<StakeholderPage, DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list(filter, page).await
        }
    }

    #[tokio::test]
    async fn stream_walks_all_pages_in_id_order() {
        let directory = CountingDirectory {
            inner: InMemoryDirectory::new(
                ["e", "c", "a", "d", "b"].iter().map(|id| record(id, true)),
            ),
            calls: AtomicUsize::new(0),
        };

        let ids: Vec<String> =
            stream_stakeholders(&directory, StakeholderFilter::all(), 2)
                .map_ok(|record| record.id)
                .try_collect()
                .await
                .expect("stream");

        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
        // Pages of 2, 2 and a short final page of 1.
        assert_eq!(directory.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stream_applies_filter() {
        let directory = InMemoryDirectory::new(vec![
            record("a", true),
            record("b", false),
            record("c", true),
        ]);
        let ids: Vec<String> =
            stream_stakeholders(&directory, StakeholderFilter::federal(), 10)
                .map_ok(|record| record.id)
                .try_collect()
                .await
                .expect("stream");
        assert_eq!(ids, vec!["a", "c"]);
    }
}
