//! # Config Module
//!
//! Hierarchical run configuration: YAML/TOML documents composed through
//! `defaults:` lists, command-line style overrides, `${...}` interpolation and
//! closed trees that only accept new keys inside an open-edit scope.
//!
//! ## Key Components
//!
//! - [`ConfigContext`] - Explicit composition context (search directory and
//!   document cache) released on [`ConfigContext::clear`] or drop
//! - [`Config`] - A composed tree with typed dotted-path access and scoped edits
//! - [`ConfigValue`] / [`ConfigMap`] - The value tree itself
//! - [`Override`] - Parsed `key=value`, `+key=value`, `++key=value` and `~key` overrides
//!
//! ## Usage
//!
//! ```ignore
//! use workbench::config::{ComposeOptions, ConfigContext};
//!
//! let mut ctx = ConfigContext::initialize("configs")?;
//! let mut cfg = ctx.compose("train.yaml", &["trainer=cpu"], ComposeOptions::default())?;
//! cfg.open(|c| c.set("trainer.max_epochs", 1))?;
//! ```

mod context;
mod error;
mod interpolation;
mod loader;
mod overrides;
mod tree;
mod value;

pub use context::{ComposeOptions, ConfigContext, META_KEY};
pub use error::ConfigError;
pub use loader::{find_root, load, read_document};
pub use overrides::Override;
pub use tree::Config;
pub use value::{ConfigMap, ConfigValue, MISSING_MARKER};
