//! Stakeholder records as read from the directory, plus the address
//! normalisation rules shared by every recipient computation.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named technical point of contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
}

/// Organisational type of a stakeholder. Selects the wording variant of
/// the per-category templates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum StakeholderKind {
    Federal,
    State,
    Local,
    Tribal,
    Territorial,
    Private,
    #[default]
    #[serde(other)]
    Unknown,
}

impl StakeholderKind {
    /// Lenient parse used at the storage boundary; unrecognised values map
    /// to [`StakeholderKind::Unknown`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FEDERAL" => Self::Federal,
            "STATE" => Self::State,
            "LOCAL" => Self::Local,
            "TRIBAL" => Self::Tribal,
            "TERRITORIAL" => Self::Territorial,
            "PRIVATE" => Self::Private,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Federal => "FEDERAL",
            Self::State => "STATE",
            Self::Local => "LOCAL",
            Self::Tribal => "TRIBAL",
            Self::Territorial => "TERRITORIAL",
            Self::Private => "PRIVATE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for StakeholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeholderRecord {
    pub id: String,
    /// Short name (usually the acronym) used in subjects and greetings.
    pub display_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub federal: bool,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub kind: StakeholderKind,
    #[serde(default)]
    pub technical_contacts: Vec<Contact>,
    #[serde(default)]
    pub distribution_lists: Vec<String>,
    #[serde(default)]
    pub retired: bool,
}

/// Why a stored record cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidStakeholder {
    #[error("record has an empty id")]
    EmptyId,
}

impl StakeholderRecord {
    /// Validate and normalise a record coming out of a backing store.
    ///
    /// The id must be non-empty. An empty display name falls back to the id
    /// and the region code is trimmed and upper-cased.
    pub fn validated(mut self) -> Result<Self, InvalidStakeholder> {
        self.id = self.id.trim().to_string();
        if self.id.is_empty() {
            return Err(InvalidStakeholder::EmptyId);
        }
        if self.display_name.trim().is_empty() {
            self.display_name = self.id.clone();
        } else {
            self.display_name = self.display_name.trim().to_string();
        }
        self.region = self
            .region
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_ascii_uppercase);
        Ok(self)
    }

    /// Technical contacts followed by distribution lists, trimmed and with
    /// exact duplicates removed. Order of first appearance is kept.
    pub fn notification_addresses(&self) -> Vec<String> {
        dedupe_addresses(
            self.technical_contacts
                .iter()
                .map(|contact| contact.email.as_str())
                .chain(self.distribution_lists.iter().map(String::as_str)),
        )
    }

    /// Technical contacts that carry a usable address.
    pub fn technical_pocs(&self) -> Vec<Contact> {
        self.technical_contacts
            .iter()
            .filter_map(|contact| {
                let email = contact.email.trim();
                (!email.is_empty()).then(|| Contact {
                    name: contact
                        .name
                        .as_deref()
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(str::to_string),
                    email: email.to_string(),
                })
            })
            .collect()
    }
}

/// Trim each address, drop empties and remove exact duplicates while
/// keeping first-appearance order. Case is preserved.
pub fn dedupe_addresses<I, S>(addresses: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for address in addresses {
        let trimmed = address.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Bulk query filter. Retired stakeholders are always excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StakeholderFilter {
    pub federal_only: bool,
}

impl StakeholderFilter {
    pub const fn all() -> Self {
        Self {
            federal_only: false,
        }
    }

    pub const fn federal() -> Self {
        Self { federal_only: true }
    }

    pub fn matches(&self, record: &StakeholderRecord) -> bool {
        !record.retired && (!self.federal_only || record.federal)
    }
}

/// Keyset page request: up to `limit` records with ids strictly greater
/// than `after`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub after: Option<String>,
}

impl Page {
    pub fn first(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
            after: None,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::first(500)
    }
}
