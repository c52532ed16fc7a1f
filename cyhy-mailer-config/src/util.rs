use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::loader::error::ConfigLoadError;

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

pub fn parse_csv_var(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|raw| parse_csv(&raw))
}

/// Parse a boolean value from a raw string, accepting common env-style forms.
///
/// Accepted truthy values (case-insensitive): `"1"`, `"true"`, `"yes"`, `"on"`.
/// Accepted falsy values: `"0"`, `"false"`, `"no"`, `"off"`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Boolean variable; set but unrecognised is an error, not "unset".
pub fn parse_bool_var(name: &'static str) -> Result<Option<bool>, ConfigLoadError> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    parse_bool(&raw).map(Some).ok_or_else(|| ConfigLoadError::InvalidEnvVar {
        name,
        value: raw,
        reason: "expected one of 1/0, true/false, yes/no, on/off".to_string(),
    })
}

/// Variable parsed with [`FromStr`]; set but unparseable is an error.
pub fn parse_var<T>(name: &'static str) -> Result<Option<T>, ConfigLoadError>
where
    T: FromStr,
    T::Err: Display,
{
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|err: T::Err| ConfigLoadError::InvalidEnvVar {
            name,
            value: raw.clone(),
            reason: err.to_string(),
        })
}

/// Non-empty variable as a path.
pub fn path_var(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|raw| !raw.trim().is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_drops_blank_entries() {
        assert_eq!(parse_csv(" a@x.gov, ,b@x.gov,"), vec!["a@x.gov", "b@x.gov"]);
        assert!(parse_csv("").is_empty());
    }

    #[test]
    fn bool_accepts_env_style_values() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
