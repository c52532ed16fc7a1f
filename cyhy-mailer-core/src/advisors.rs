//! Region advisor map: two-letter region code to oversight contact.
//!
//! The file is TOML, either a flat table or one nested under `[advisors]`:
//!
//! ```toml
//! [advisors]
//! VA = "region3@example.gov"
//! MD = "region3@example.gov"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MailerError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvisorMap {
    entries: Option<BTreeMap<String, String>>,
}

impl AdvisorMap {
    /// Map with advisor CC switched off; every lookup misses.
    pub fn disabled() -> Self {
        Self { entries: None }
    }

    /// Build from `(code, address)` pairs. `path` only labels errors.
    pub fn from_entries<I, K, V>(path: &Path, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map = BTreeMap::new();
        for (code, address) in entries {
            let code = normalize_code(code.as_ref())
                .ok_or_else(|| invalid(path, format!(
                    "region code '{}' is not two ASCII letters",
                    code.as_ref()
                )))?;
            let address = address.as_ref().trim();
            if address.is_empty() {
                return Err(invalid(
                    path,
                    format!("region {code} has an empty address"),
                ));
            }
            map.insert(code, address.to_string());
        }
        Ok(Self { entries: Some(map) })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            invalid(path, format!("failed to read file: {e}"))
        })?;
        Self::parse(path, &raw)
    }

    pub fn parse(path: &Path, raw: &str) -> Result<Self> {
        let mut table: toml::Table = toml::from_str(raw)
            .map_err(|e| invalid(path, e.to_string()))?;
        let table = match table.remove("advisors") {
            Some(toml::Value::Table(nested)) => nested,
            Some(_) => {
                return Err(invalid(path, "`advisors` must be a table".into()));
            }
            None => table,
        };

        let mut pairs = Vec::with_capacity(table.len());
        for (code, value) in table {
            let toml::Value::String(address) = value else {
                return Err(invalid(
                    path,
                    format!("address for region '{code}' must be a string"),
                ));
            };
            pairs.push((code, address));
        }

        let map = Self::from_entries(path, pairs)?;
        debug!(path = %path.display(), regions = map.len(), "advisor map loaded");
        Ok(map)
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn lookup(&self, code: &str) -> Option<&str> {
        let entries = self.entries.as_ref()?;
        let code = normalize_code(code)?;
        entries.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    (code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| code.to_ascii_uppercase())
}

fn invalid(path: &Path, reason: String) -> MailerError {
    MailerError::AdvisorMap {
        path: PathBuf::from(path),
        reason,
    }
}
