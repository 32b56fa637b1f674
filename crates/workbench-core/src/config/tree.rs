use super::error::ConfigError;
use super::interpolation;
use super::value::{ConfigMap, ConfigValue};
use serde::de::DeserializeOwned;
use tracing::trace;

/// A composed, structured configuration.
///
/// A closed config (the state [`ConfigContext::compose`](super::ConfigContext::compose)
/// returns) accepts assignments to existing keys only; adding keys or turning a
/// mapping into a scalar requires an edit scope opened with [`Config::open`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    root: ConfigMap,
    closed: bool,
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

impl Config {
    /// Wraps a mapping as an open (editable) config.
    pub fn new(root: ConfigMap) -> Self {
        Self {
            root,
            closed: false,
        }
    }

    pub fn from_value(value: ConfigValue) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Map(root) => Ok(Self::new(root)),
            ConfigValue::Null => Ok(Self::default()),
            _ => Err(ConfigError::TypeMismatch {
                key: "<root>".to_string(),
                expected: "a mapping",
            }),
        }
    }

    pub fn root(&self) -> &ConfigMap {
        &self.root
    }

    pub fn into_root(self) -> ConfigMap {
        self.root
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Runs `edit` inside an open-edit scope. The previous mode is restored
    /// afterwards, whether or not `edit` succeeds.
    pub fn open<T, F>(&mut self, edit: F) -> Result<T, ConfigError>
    where
        F: FnOnce(&mut Config) -> Result<T, ConfigError>,
    {
        let was_closed = self.closed;
        self.closed = false;
        let result = edit(self);
        self.closed = was_closed;
        result
    }

    /// Looks up a dotted path. Numeric segments index into lists.
    pub fn select(&self, path: &str) -> Option<&ConfigValue> {
        let mut segments = split_path(path).into_iter();
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = match current {
                ConfigValue::Map(map) => map.get(segment)?,
                ConfigValue::List(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.select(path).is_some()
    }

    pub fn get(&self, path: &str) -> Result<&ConfigValue, ConfigError> {
        self.select(path).ok_or_else(|| ConfigError::MissingKey {
            key: path.to_string(),
        })
    }

    fn get_present(&self, path: &str) -> Result<&ConfigValue, ConfigError> {
        let value = self.get(path)?;
        if value.is_missing() {
            return Err(ConfigError::MandatoryMissing {
                key: path.to_string(),
            });
        }
        Ok(value)
    }

    pub fn get_str(&self, path: &str) -> Result<&str, ConfigError> {
        self.get_present(path)?
            .as_str()
            .ok_or_else(|| ConfigError::TypeMismatch {
                key: path.to_string(),
                expected: "a string",
            })
    }

    pub fn get_i64(&self, path: &str) -> Result<i64, ConfigError> {
        self.get_present(path)?
            .as_i64()
            .ok_or_else(|| ConfigError::TypeMismatch {
                key: path.to_string(),
                expected: "an integer",
            })
    }

    pub fn get_f64(&self, path: &str) -> Result<f64, ConfigError> {
        self.get_present(path)?
            .as_f64()
            .ok_or_else(|| ConfigError::TypeMismatch {
                key: path.to_string(),
                expected: "a number",
            })
    }

    pub fn get_bool(&self, path: &str) -> Result<bool, ConfigError> {
        self.get_present(path)?
            .as_bool()
            .ok_or_else(|| ConfigError::TypeMismatch {
                key: path.to_string(),
                expected: "a boolean",
            })
    }

    pub fn get_map(&self, path: &str) -> Result<&ConfigMap, ConfigError> {
        self.get_present(path)?
            .as_map()
            .ok_or_else(|| ConfigError::TypeMismatch {
                key: path.to_string(),
                expected: "a mapping",
            })
    }

    /// Deserializes the (unresolved) node at `path` into `T`.
    pub fn extract<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConfigError> {
        let node = self.get_present(path)?;
        serde_yaml::from_value(node.to_yaml()).map_err(|source| ConfigError::Deserialize {
            key: path.to_string(),
            source,
        })
    }

    /// Assigns `value` at `path`.
    ///
    /// On a closed config every segment must already exist and a mapping may
    /// only be replaced by another mapping. In an edit scope missing
    /// intermediate mappings are created and null nodes along the path are
    /// promoted to mappings.
    pub fn set(&mut self, path: &str, value: impl Into<ConfigValue>) -> Result<(), ConfigError> {
        let value = value.into();
        let segments = split_path(path);
        let Some((last, parents)) = segments.split_last() else {
            return Err(ConfigError::MissingKey {
                key: path.to_string(),
            });
        };
        let closed = self.closed;

        let mut current = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let walked = || segments[..=depth].join(".");
            if !current.contains_key(segment) {
                if closed {
                    return Err(ConfigError::UnknownKey { key: walked() });
                }
                current.insert(*segment, ConfigValue::Map(ConfigMap::new()));
            }
            let Some(node) = current.get_mut(segment) else {
                return Err(ConfigError::MissingKey { key: walked() });
            };
            if node.is_null() && !closed {
                *node = ConfigValue::Map(ConfigMap::new());
            }
            current = node.as_map_mut().ok_or_else(|| ConfigError::TypeMismatch {
                key: walked(),
                expected: "a mapping",
            })?;
        }

        match current.get(last) {
            None if closed => {
                return Err(ConfigError::UnknownKey {
                    key: path.to_string(),
                });
            }
            Some(ConfigValue::Map(_)) if closed && !matches!(value, ConfigValue::Map(_)) => {
                return Err(ConfigError::ShapeChange {
                    key: path.to_string(),
                });
            }
            _ => {}
        }
        trace!(key = path, "Assigning config value");
        current.insert(*last, value);
        Ok(())
    }

    /// Removes the value at `path`, returning it.
    pub fn remove(&mut self, path: &str) -> Result<ConfigValue, ConfigError> {
        let segments = split_path(path);
        let missing = || ConfigError::MissingKey {
            key: path.to_string(),
        };
        let (last, parents) = segments.split_last().ok_or_else(missing)?;
        let mut current = &mut self.root;
        for segment in parents {
            current = current
                .get_mut(segment)
                .and_then(ConfigValue::as_map_mut)
                .ok_or_else(missing)?;
        }
        current.remove(last).ok_or_else(missing)
    }

    /// Deep-merges a mapping into the root, ignoring the closed flag.
    pub fn merge(&mut self, other: ConfigMap) {
        self.root.merge(other);
    }

    /// Returns a copy with every `${...}` interpolation substituted.
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let root = interpolation::resolve_map(&self.root)?;
        Ok(Config {
            root,
            closed: self.closed,
        })
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(&ConfigValue::Map(self.root.clone()).to_yaml())
            .map_err(ConfigError::Render)
    }
}
