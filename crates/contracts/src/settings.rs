//! Settings - connection string parsing
//!
//! A connection string is a `;`-delimited list of `key=value` pairs. Keys are
//! case-insensitive. A value wrapped in `{ }` may itself contain `;` and `=`
//! (nested settings are kept verbatim, without the outer braces).

use std::collections::HashMap;
use std::time::Duration;

use crate::ContractError;

/// Settings key holding the initialization watchdog timeout in milliseconds
pub const INITIALIZATION_TIMEOUT_KEY: &str = "initializationTimeout";

/// Timeout applied when `initializationTimeout` is absent or unparsable
pub const DEFAULT_INITIALIZATION_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Parsed connection string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Lower-cased key -> value
    values: HashMap<String, String>,
}

impl Settings {
    /// Parse a connection string
    ///
    /// # Errors
    /// Returns `ConfigParse` on unbalanced braces.
    pub fn parse(connection_string: &str) -> Result<Self, ContractError> {
        let mut values = HashMap::new();

        for pair in split_top_level(connection_string)? {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }

            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (pair, ""),
            };

            if key.is_empty() {
                continue;
            }

            values.insert(key.to_lowercase(), strip_braces(value).to_string());
        }

        Ok(Self { values })
    }

    /// Look up a value (case-insensitive key)
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(&key.to_lowercase())
    }

    /// Number of parsed pairs
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no pair was parsed
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Initialization timeout, falling back to [`DEFAULT_INITIALIZATION_TIMEOUT`]
    ///
    /// A value of `0` (or below) disables the watchdog.
    pub fn initialization_timeout(&self) -> Duration {
        self.initialization_timeout_or(DEFAULT_INITIALIZATION_TIMEOUT)
    }

    /// Initialization timeout, falling back to `default`
    pub fn initialization_timeout_or(&self, default: Duration) -> Duration {
        self.get(INITIALIZATION_TIMEOUT_KEY)
            .and_then(|v| v.parse::<i64>().ok())
            .map(|ms| Duration::from_millis(ms.max(0) as u64))
            .unwrap_or(default)
    }
}

/// Split on `;` that are not nested inside braces
fn split_top_level(input: &str) -> Result<Vec<&str>, ContractError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, ch) in input.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    ContractError::config_parse(format!(
                        "unbalanced '}}' at position {idx} in connection string"
                    ))
                })?;
            }
            ';' if depth == 0 => {
                parts.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(ContractError::config_parse(
            "unbalanced '{' in connection string",
        ));
    }

    parts.push(&input[start..]);
    Ok(parts)
}

fn strip_braces(value: &str) -> &str {
    value
        .strip_prefix('{')
        .and_then(|v| v.strip_suffix('}'))
        .map(str::trim)
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs_case_insensitive() {
        let settings = Settings::parse("Port=4712; InitializationTimeout = 2500 ;flag").unwrap();
        assert_eq!(settings.get("port"), Some("4712"));
        assert_eq!(settings.get("PORT"), Some("4712"));
        assert_eq!(settings.get("flag"), Some(""));
        assert_eq!(settings.initialization_timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_nested_braces_kept_verbatim() {
        let settings = Settings::parse("server=localhost; transport={protocol=udp; port=5000}").unwrap();
        assert_eq!(settings.get("transport"), Some("protocol=udp; port=5000"));
        assert_eq!(settings.len(), 2);
    }

    #[test]
    fn test_timeout_falls_back_to_default() {
        assert_eq!(
            Settings::parse("").unwrap().initialization_timeout(),
            DEFAULT_INITIALIZATION_TIMEOUT
        );
        assert_eq!(
            Settings::parse("initializationTimeout=soon")
                .unwrap()
                .initialization_timeout(),
            DEFAULT_INITIALIZATION_TIMEOUT
        );
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        assert!(Settings::parse("a={b=c").is_err());
        assert!(Settings::parse("a=b}").is_err());
    }
}
