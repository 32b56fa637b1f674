use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: '{path}'")]
    FileNotFound { path: String },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error for '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config document '{path}': {reason}")]
    InvalidDocument { path: String, reason: String },

    #[error("Invalid defaults list in '{path}': {reason}")]
    InvalidDefaults { path: String, reason: String },

    #[error("Could not find option '{option}' for config group '{group}'")]
    UnknownGroupOption { group: String, option: String },

    #[error("Key not found: '{key}'")]
    MissingKey { key: String },

    #[error("Missing mandatory value: '{key}'")]
    MandatoryMissing { key: String },

    #[error("Key '{key}' is not in the config; open an edit scope or use '+{key}=...' to add it")]
    UnknownKey { key: String },

    #[error("Key '{key}' already exists; use '++{key}=...' to force the assignment")]
    KeyExists { key: String },

    #[error("Cannot replace the mapping at '{key}' with a non-mapping value outside an edit scope")]
    ShapeChange { key: String },

    #[error("Value at '{key}' is not {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Invalid override '{raw}': {reason}")]
    InvalidOverride { raw: String, reason: String },

    #[error("Interpolation cycle detected while resolving '{key}'")]
    InterpolationCycle { key: String },

    #[error("Interpolation references unknown key '{key}'")]
    InterpolationKey { key: String },

    #[error("Malformed interpolation in '{value}'")]
    InterpolationSyntax { value: String },

    #[error("Environment variable '{name}' is not set and no default was given")]
    EnvVarMissing { name: String },

    #[error("Could not find '{indicator}' in '{start}' or any of its parent directories")]
    RootNotFound { indicator: String, start: String },

    #[error("Value at '{key}' does not match the expected structure: {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to render config as YAML: {0}")]
    Render(#[source] serde_yaml::Error),
}
