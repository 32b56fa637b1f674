use super::error::TransformError;
use super::params::TransformParams;
use super::{Transform, compose, coordinate, sequence, torsional};
use crate::config::ConfigValue;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Key naming the factory that builds a transform node.
pub const TARGET_KEY: &str = "_target_";

pub type TransformFactory =
    fn(&TransformParams<'_>, &TransformRegistry) -> Result<Box<dyn Transform>, TransformError>;

/// Name → factory table used to instantiate transforms from config nodes.
#[derive(Default)]
pub struct TransformRegistry {
    factories: BTreeMap<String, TransformFactory>,
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in transform.
    pub fn with_builtins() -> Result<Self, TransformError> {
        let mut registry = Self::new();
        registry.register(torsional::NAME, torsional::factory)?;
        registry.register(coordinate::NAME, coordinate::factory)?;
        registry.register(sequence::NAME, sequence::factory)?;
        registry.register(compose::NAME, compose::factory)?;
        Ok(registry)
    }

    pub fn register(&mut self, name: &str, factory: TransformFactory) -> Result<(), TransformError> {
        if self.factories.contains_key(name) {
            return Err(TransformError::DuplicateName {
                name: name.to_string(),
            });
        }
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Builds the transform described by `node`, a mapping with a `_target_`
    /// key and the transform's parameters.
    pub fn instantiate(&self, node: &ConfigValue) -> Result<Box<dyn Transform>, TransformError> {
        let map = node.as_map().ok_or(TransformError::InvalidNode {
            found: node.type_name(),
        })?;
        let target = map
            .get(TARGET_KEY)
            .and_then(ConfigValue::as_str)
            .ok_or(TransformError::MissingTarget)?;
        let factory = self
            .factories
            .get(target)
            .ok_or_else(|| TransformError::UnknownTarget {
                target: target.to_string(),
                registered: self.names().collect::<Vec<_>>().join(", "),
            })?;

        let transform = factory(&TransformParams::new(target, map), self)?;
        debug!("Instantiated transform '{}': {:?}", target, transform);
        Ok(transform)
    }
}
