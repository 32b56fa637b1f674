use super::error::HarnessError;
use crate::config;
use crate::geometry::calculate_rmsd;
use crate::protein::Protein;
use crate::transforms::{Transform, TransformRegistry};
use rand::RngCore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Outcome of applying a transform to one structure.
#[derive(Debug, Clone)]
pub struct TransformReport {
    pub transform: &'static str,
    pub rmsd: f64,
    pub num_residues: usize,
    pub input: Protein,
    pub output: Protein,
}

/// Loads the transform file at `path` and instantiates the node under `key`.
#[instrument(level = "debug", skip(registry))]
pub fn load_transform(
    registry: &TransformRegistry,
    path: &Path,
    key: &str,
) -> Result<Box<dyn Transform>, HarnessError> {
    let document = config::load(path)?.resolve()?;
    let node = document.get(key)?;
    Ok(registry.instantiate(node)?)
}

/// CA deviation between two structures of equal length, as the root mean
/// square over every x, y and z component. This is the per-atom RMSD divided
/// by √3.
pub fn ca_rmsd(a: &Protein, b: &Protein) -> Result<f64, HarnessError> {
    calculate_rmsd(&a.ca_coords(), &b.ca_coords())
        .map(|per_atom| per_atom / 3f64.sqrt())
        .ok_or(HarnessError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        })
}

/// Applies `transform` to `protein`, keeping a copy of the input for
/// comparison.
pub fn run_transform(
    transform: &dyn Transform,
    protein: Protein,
    rng: &mut dyn RngCore,
) -> Result<TransformReport, HarnessError> {
    let input = protein.clone();
    let output = transform.apply(protein, rng)?;
    let rmsd = ca_rmsd(&output, &input)?;
    debug!("'{}' moved CA atoms by {:.4} Å RMSD", transform.name(), rmsd);
    Ok(TransformReport {
        transform: transform.name(),
        rmsd,
        num_residues: input.len(),
        input,
        output,
    })
}

/// [`load_transform`] followed by [`run_transform`].
pub fn run_configured_transform(
    registry: &TransformRegistry,
    path: &Path,
    key: &str,
    protein: Protein,
    rng: &mut dyn RngCore,
) -> Result<TransformReport, HarnessError> {
    let transform = load_transform(registry, path, key)?;
    run_transform(transform.as_ref(), protein, rng)
}

/// Accepts only a finite, strictly positive deviation.
pub fn check_deviation(rmsd: f64) -> Result<f64, HarnessError> {
    if rmsd.is_finite() && rmsd > 0.0 {
        Ok(rmsd)
    } else {
        Err(HarnessError::DeviationOutOfBounds { rmsd })
    }
}

/// Writes `<prefix>_input.pdb` and `<prefix>_output.pdb` into `dir`.
pub fn write_snapshots(
    report: &TransformReport,
    dir: &Path,
    prefix: &str,
) -> Result<Vec<PathBuf>, HarnessError> {
    let io_error = |path: &Path, source: std::io::Error| HarnessError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    };
    fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

    let mut written = Vec::with_capacity(2);
    for (label, protein) in [("input", &report.input), ("output", &report.output)] {
        let path = dir.join(format!("{}_{}.pdb", prefix, label));
        fs::write(&path, protein.to_pdb()).map_err(|e| io_error(&path, e))?;
        written.push(path);
    }
    info!("Wrote structure snapshots to {:?}", dir);
    Ok(written)
}
