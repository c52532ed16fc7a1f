//! Report locator: enumerate a category directory and group the report
//! files by the stakeholder id embedded in their names.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::category::{CategoryDescriptor, NamingConvention, ReportCategory};
use crate::error::{MailerError, Result};

/// One report file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub stakeholder_id: String,
    pub category: ReportCategory,
    pub path: PathBuf,
    pub size: u64,
}

impl ReportArtifact {
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

/// All artifacts of one stakeholder within one category, ordered by file
/// name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportGroup {
    pub stakeholder_id: String,
    pub category: ReportCategory,
    pub artifacts: Vec<ReportArtifact>,
}

impl ReportGroup {
    pub fn total_size(&self) -> u64 {
        self.artifacts.iter().map(|artifact| artifact.size).sum()
    }
}

/// Result of one directory scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatedReports {
    /// Groups in lexical stakeholder-id order.
    pub groups: Vec<ReportGroup>,
    /// Files whose names did not follow the convention or that could not
    /// be read.
    pub skipped_files: Vec<PathBuf>,
}

impl LocatedReports {
    pub fn stakeholder_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|group| group.stakeholder_id.as_str())
    }
}

/// Scan the directory of an enabled category. A disabled category yields
/// no groups.
pub async fn locate(descriptor: &CategoryDescriptor) -> Result<LocatedReports> {
    match descriptor.directory.as_deref() {
        Some(dir) => {
            scan_directory(dir, descriptor.category, &descriptor.convention)
                .await
        }
        None => Ok(LocatedReports::default()),
    }
}

pub async fn scan_directory(
    dir: &Path,
    category: ReportCategory,
    convention: &NamingConvention,
) -> Result<LocatedReports> {
    let unreadable = |source: std::io::Error| MailerError::ReportDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    let mut grouped: BTreeMap<String, Vec<ReportArtifact>> = BTreeMap::new();
    let mut skipped_files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!(path = %path.display(), "skipping file with non UTF-8 name");
            skipped_files.push(path);
            continue;
        };
        if file_name.starts_with('.') {
            continue;
        }

        let Some(stakeholder_id) = convention.stakeholder_id(file_name) else {
            if entry.file_type().await.is_ok_and(|kind| kind.is_dir()) {
                continue;
            }
            warn!(
                category = %category,
                file = file_name,
                pattern = convention.pattern(),
                "skipping file that does not match the naming convention"
            );
            skipped_files.push(path);
            continue;
        };

        // Follows symlinks; a dangling link or a file removed mid-scan only
        // costs that entry.
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(
                    category = %category,
                    file = file_name,
                    error = %err,
                    "skipping unreadable report file"
                );
                skipped_files.push(path);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        grouped
            .entry(stakeholder_id.clone())
            .or_default()
            .push(ReportArtifact {
                stakeholder_id,
                category,
                path,
                size: metadata.len(),
            });
    }

    let groups: Vec<ReportGroup> = grouped
        .into_iter()
        .map(|(stakeholder_id, mut artifacts)| {
            artifacts.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
            ReportGroup {
                stakeholder_id,
                category,
                artifacts,
            }
        })
        .collect();
    skipped_files.sort();

    debug!(
        category = %category,
        dir = %dir.display(),
        groups = groups.len(),
        skipped = skipped_files.len(),
        "report directory scanned"
    );

    Ok(LocatedReports {
        groups,
        skipped_files,
    })
}
