use super::error::ConfigError;
use super::tree::Config;
use super::value::{ConfigMap, ConfigValue};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a YAML or TOML document (chosen by extension) into a value tree.
pub fn read_document(path: &Path) -> Result<ConfigValue, ConfigError> {
    let path_str = path.to_string_lossy().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
            path: path_str.clone(),
        },
        _ => ConfigError::Io {
            path: path_str.clone(),
            source: e,
        },
    })?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path_str.clone(),
            source: e,
        })?;
        Ok(ConfigValue::from_toml(value))
    } else {
        let value: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Yaml {
                path: path_str.clone(),
                source: e,
            })?;
        ConfigValue::from_yaml(value).map_err(|reason| ConfigError::InvalidDocument {
            path: path_str,
            reason,
        })
    }
}

/// Reads a document whose top level must be a mapping (an empty file is an
/// empty mapping).
pub(crate) fn read_mapping(path: &Path) -> Result<ConfigMap, ConfigError> {
    match read_document(path)? {
        ConfigValue::Map(map) => Ok(map),
        ConfigValue::Null => Ok(ConfigMap::new()),
        other => Err(ConfigError::InvalidDocument {
            path: path.to_string_lossy().to_string(),
            reason: format!("top level is {}, expected a mapping", other.type_name()),
        }),
    }
}

/// Loads a single config file without composition. The result is open for
/// editing.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    debug!("Loading configuration from file: {:?}", path);
    Ok(Config::new(read_mapping(path)?))
}

/// Walks from `start` towards the filesystem root and returns the first
/// directory containing a file or directory named `indicator`.
pub fn find_root(start: &Path, indicator: &str) -> Result<PathBuf, ConfigError> {
    let start = if start.is_absolute() {
        start.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| ConfigError::Io {
                path: start.to_string_lossy().to_string(),
                source: e,
            })?
            .join(start)
    };

    let found = start
        .ancestors()
        .find(|dir| dir.join(indicator).exists())
        .map(Path::to_path_buf);

    match found {
        Some(root) => {
            debug!("Resolved project root {:?} via '{}'", root, indicator);
            Ok(root)
        }
        None => Err(ConfigError::RootNotFound {
            indicator: indicator.to_string(),
            start: start.to_string_lossy().to_string(),
        }),
    }
}
