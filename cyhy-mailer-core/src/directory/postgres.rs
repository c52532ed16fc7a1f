use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};
use tracing::{debug, info, warn};

use super::{DirectoryError, StakeholderDirectory, StakeholderPage};
use crate::stakeholder::{
    Contact, Page, StakeholderFilter, StakeholderKind, StakeholderRecord,
};

const SELECT_COLUMNS: &str = r#"
    SELECT
        id,
        display_name,
        name,
        federal,
        region,
        kind,
        technical_contacts,
        distribution_lists,
        retired
    FROM stakeholders
"#;

/// Stakeholder directory backed by the `stakeholders` table.
#[derive(Debug, Clone)]
pub struct PostgresStakeholderDirectory {
    pool: PgPool,
}

impl PostgresStakeholderDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool; the engine issues one query at a time.
    pub async fn connect(url: &str) -> Result<Self, DirectoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .connect(url)
            .await
            .map_err(|e| {
                DirectoryError::Unavailable(format!(
                    "Database connection failed: {e}"
                ))
            })?;
        info!("stakeholder directory connected");
        Ok(Self::new(pool))
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Verify connectivity and that the stakeholder table is readable.
    /// Returns the number of active stakeholders.
    pub async fn preflight(&self) -> Result<i64, DirectoryError> {
        sqlx::query("SELECT 1")
            .execute(self.pool())
            .await
            .map_err(|e| {
                DirectoryError::Unavailable(format!(
                    "Failed to execute test query: {e}"
                ))
            })?;

        let row = sqlx::query(
            "SELECT COUNT(*) AS active FROM stakeholders WHERE retired = false",
        )
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            DirectoryError::Query(format!(
                "Failed to read stakeholders table: {e}"
            ))
        })?;

        row.try_get::<i64, _>("active").map_err(|e| {
            DirectoryError::Query(format!("Failed to read active count: {e}"))
        })
    }

    fn map_row(row: &PgRow) -> Result<StakeholderRecord, DirectoryError> {
        let id: String = row.try_get("id").map_err(|e| {
            DirectoryError::Query(format!("Failed to read stakeholder id: {e}"))
        })?;
        let invalid = |reason: String| DirectoryError::InvalidRecord {
            id: id.clone(),
            reason,
        };

        let display_name: Option<String> = row
            .try_get("display_name")
            .map_err(|e| invalid(format!("display_name: {e}")))?;
        let name: Option<String> = row
            .try_get("name")
            .map_err(|e| invalid(format!("name: {e}")))?;
        let federal: Option<bool> = row
            .try_get("federal")
            .map_err(|e| invalid(format!("federal: {e}")))?;
        let region: Option<String> = row
            .try_get("region")
            .map_err(|e| invalid(format!("region: {e}")))?;
        let kind: Option<String> = row
            .try_get("kind")
            .map_err(|e| invalid(format!("kind: {e}")))?;
        let contacts: Option<serde_json::Value> = row
            .try_get("technical_contacts")
            .map_err(|e| invalid(format!("technical_contacts: {e}")))?;
        let distribution_lists: Option<Vec<String>> = row
            .try_get("distribution_lists")
            .map_err(|e| invalid(format!("distribution_lists: {e}")))?;
        let retired: Option<bool> = row
            .try_get("retired")
            .map_err(|e| invalid(format!("retired: {e}")))?;

        let technical_contacts: Vec<Contact> = match contacts {
            Some(value) if !value.is_null() => serde_json::from_value(value)
                .map_err(|e| invalid(format!("technical_contacts: {e}")))?,
            _ => Vec::new(),
        };

        StakeholderRecord {
            id: id.clone(),
            display_name: display_name.unwrap_or_default(),
            name,
            federal: federal.unwrap_or(false),
            region,
            kind: kind
                .as_deref()
                .map(StakeholderKind::parse)
                .unwrap_or_default(),
            technical_contacts,
            distribution_lists: distribution_lists.unwrap_or_default(),
            retired: retired.unwrap_or(false),
        }
        .validated()
        .map_err(|reason| DirectoryError::invalid_record(id.as_str(), reason))
    }
}

#[async_trait]
impl StakeholderDirectory for PostgresStakeholderDirectory {
    async fn get(
        &self,
        id: &str,
    ) -> Result<Option<StakeholderRecord>, DirectoryError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.trim())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| {
                DirectoryError::Query(format!(
                    "Failed to fetch stakeholder {id}: {e}"
                ))
            })?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn list(
        &self,
        filter: &StakeholderFilter,
        page: Page,
    ) -> Result<StakeholderPage, DirectoryError> {
        let sql = format!(
            "{SELECT_COLUMNS}
            WHERE retired = false
              AND ($2 = false OR federal = true)
              AND ($1::text IS NULL OR id > $1)
            ORDER BY id
            LIMIT $3"
        );
        let limit = page.limit.max(1);
        let rows = sqlx::query(&sql)
            .bind(page.after.as_deref())
            .bind(filter.federal_only)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(|e| {
                DirectoryError::Query(format!(
                    "Failed to list stakeholders: {e}"
                ))
            })?;

        // The cursor follows raw rows so a skipped record cannot end paging
        // early.
        let next_after = if rows.len() == limit as usize {
            rows.last()
                .and_then(|row| row.try_get::<String, _>("id").ok())
        } else {
            None
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::map_row(row) {
                Ok(record) => records.push(record),
                Err(err) if err.is_record_level() => {
                    warn!(error = %err, "skipping invalid stakeholder record");
                }
                Err(err) => return Err(err),
            }
        }
        debug!(
            fetched = rows.len(),
            kept = records.len(),
            "stakeholder page loaded"
        );

        Ok(StakeholderPage {
            records,
            next_after,
        })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
