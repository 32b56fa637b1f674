use super::error::ConfigError;
use super::value::ConfigValue;
use std::fmt;

/// A single command-line style override.
#[derive(Debug, Clone, PartialEq)]
pub enum Override {
    /// `key=value`: assign an existing key (or pick a group option).
    Assign { key: String, value: ConfigValue },
    /// `+key=value`: add a key that must not exist yet.
    Append { key: String, value: ConfigValue },
    /// `++key=value`: assign, creating the key if needed.
    Force { key: String, value: ConfigValue },
    /// `~key`: delete a key (or drop a group from the defaults list).
    Delete { key: String },
}

fn parse_value(raw: &str, value: &str) -> Result<ConfigValue, ConfigError> {
    if value.is_empty() {
        return Ok(ConfigValue::String(String::new()));
    }
    let parsed: serde_yaml::Value =
        serde_yaml::from_str(value).map_err(|e| ConfigError::InvalidOverride {
            raw: raw.to_string(),
            reason: e.to_string(),
        })?;
    ConfigValue::from_yaml(parsed).map_err(|reason| ConfigError::InvalidOverride {
        raw: raw.to_string(),
        reason,
    })
}

fn validate_key(raw: &str, key: &str) -> Result<(), ConfigError> {
    let valid = !key.is_empty()
        && key.split('.').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/' | '@'))
        });
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidOverride {
            raw: raw.to_string(),
            reason: format!("'{}' is not a valid key", key),
        })
    }
}

impl Override {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();

        if let Some(key) = trimmed.strip_prefix('~') {
            let key = key.split_once('=').map_or(key, |(k, _)| k);
            validate_key(raw, key)?;
            return Ok(Override::Delete {
                key: key.to_string(),
            });
        }

        let (key, value) = trimmed
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidOverride {
                raw: raw.to_string(),
                reason: "expected KEY=VALUE".to_string(),
            })?;

        let (plus_count, key) = if let Some(k) = key.strip_prefix("++") {
            (2, k)
        } else if let Some(k) = key.strip_prefix('+') {
            (1, k)
        } else {
            (0, key)
        };

        let key = key.trim();
        validate_key(raw, key)?;
        let key = key.to_string();
        let value = parse_value(raw, value.trim())?;
        Ok(match plus_count {
            2 => Override::Force { key, value },
            1 => Override::Append { key, value },
            _ => Override::Assign { key, value },
        })
    }

    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Self>, ConfigError> {
        raw.iter().map(|r| Override::parse(r.as_ref())).collect()
    }

    pub fn key(&self) -> &str {
        match self {
            Override::Assign { key, .. }
            | Override::Append { key, .. }
            | Override::Force { key, .. }
            | Override::Delete { key } => key,
        }
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Override::Assign { key, value } => write!(f, "{}={}", key, value),
            Override::Append { key, value } => write!(f, "+{}={}", key, value),
            Override::Force { key, value } => write!(f, "++{}={}", key, value),
            Override::Delete { key } => write!(f, "~{}", key),
        }
    }
}
