use super::Transform;
use super::error::TransformError;
use super::params::TransformParams;
use super::registry::TransformRegistry;
use crate::protein::Protein;
use rand::RngCore;
use tracing::trace;

pub const NAME: &str = "compose";

/// Applies a sequence of transforms in order.
#[derive(Debug, Default)]
pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
    pub fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Self { transforms }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

/// Reads a `transforms` list whose entries are transform nodes themselves.
pub(crate) fn factory(
    params: &TransformParams<'_>,
    registry: &TransformRegistry,
) -> Result<Box<dyn Transform>, TransformError> {
    params.expect_only(&["transforms"])?;
    let transforms = params
        .list("transforms")?
        .iter()
        .map(|node| registry.instantiate(node))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Box::new(Compose::new(transforms)))
}

impl Transform for Compose {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, protein: Protein, rng: &mut dyn RngCore) -> Result<Protein, TransformError> {
        self.transforms.iter().try_fold(protein, |current, transform| {
            trace!("Applying '{}'", transform.name());
            transform.apply(current, rng)
        })
    }
}
