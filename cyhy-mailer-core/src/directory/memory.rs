use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::warn;

use super::{DirectoryError, StakeholderDirectory, StakeholderPage};
use crate::stakeholder::{Page, StakeholderFilter, StakeholderRecord};

/// Directory held entirely in memory, keyed by stakeholder id.
///
/// Backs tests and offline dry runs fed from a JSON export of the
/// stakeholder collection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    records: BTreeMap<String, StakeholderRecord>,
}

impl InMemoryDirectory {
    pub fn new<I>(records: I) -> Self
    where
        I: IntoIterator<Item = StakeholderRecord>,
    {
        let mut directory = Self::default();
        for record in records {
            directory.insert(record);
        }
        directory
    }

    /// Load a JSON array of records. Records that fail validation are
    /// dropped with a warning.
    pub fn from_json_file(path: &Path) -> Result<Self, DirectoryError> {
        let raw = std::fs::read_to_string(path).map_err(|source| {
            DirectoryError::File {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let records: Vec<StakeholderRecord> = serde_json::from_str(&raw)
            .map_err(|source| DirectoryError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(records))
    }

    pub fn insert(&mut self, record: StakeholderRecord) {
        let display_name = record.display_name.clone();
        match record.validated() {
            Ok(record) => {
                self.records.insert(record.id.clone(), record);
            }
            Err(err) => {
                let err = DirectoryError::invalid_record(display_name, err);
                warn!(error = %err, "dropping invalid stakeholder record");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl StakeholderDirectory for InMemoryDirectory {
    async fn get(
        &self,
        id: &str,
    ) -> Result<Option<StakeholderRecord>, DirectoryError> {
        Ok(self.records.get(id.trim()).cloned())
    }

    async fn list(
        &self,
        filter: &StakeholderFilter,
        page: Page,
    ) -> Result<StakeholderPage, DirectoryError> {
        let limit = page.limit.max(1) as usize;
        let records: Vec<StakeholderRecord> = self
            .records
            .values()
            .filter(|record| {
                page.after
                    .as_deref()
                    .is_none_or(|after| record.id.as_str() > after)
            })
            .filter(|record| filter.matches(record))
            .take(limit)
            .cloned()
            .collect();

        let next_after = if records.len() == limit {
            records.last().map(|record| record.id.clone())
        } else {
            None
        };

        Ok(StakeholderPage {
            records,
            next_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stakeholder::InvalidStakeholder;

    #[tokio::test]
    async fn loads_records_from_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stakeholders.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "12345", "display_name": "DHS", "federal": true,
                 "region": "va", "kind": "FEDERAL",
                 "technical_contacts": [{"name": "Ann", "email": "a@x.gov"}],
                 "distribution_lists": ["b@x.gov"]},
                {"id": "  ", "display_name": "broken"}
            ]"#,
        )
        .expect("write fixture");

        let directory = InMemoryDirectory::from_json_file(&path).expect("load");
        assert_eq!(directory.len(), 1);

        let record = directory.get("12345").await.expect("get").expect("found");
        assert_eq!(record.region.as_deref(), Some("VA"));
        assert_eq!(record.notification_addresses(), vec!["a@x.gov", "b@x.gov"]);
        assert!(directory.get("missing").await.expect("get").is_none());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stakeholders.json");
        std::fs::write(&path, "{not json").expect("write fixture");
        let err = InMemoryDirectory::from_json_file(&path).expect_err("parse");
        assert!(matches!(err, DirectoryError::Parse { .. }));
        assert!(!err.is_record_level());
    }

    #[test]
    fn rejected_record_is_a_record_level_error() {
        let err = DirectoryError::invalid_record("12345", InvalidStakeholder::EmptyId);
        assert!(err.is_record_level());
        assert_eq!(
            err.to_string(),
            "stakeholder 12345 has an invalid record: record has an empty id"
        );
    }
}
