use crate::cli::TransformArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::TrialProgress;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};
use workbench::harness::{HarnessError, check_deviation, load_transform, run_transform, write_snapshots};
use workbench::protein::{RandomProteinOptions, random_protein};
use workbench::transforms::TransformRegistry;

/// Deviation statistics over all trials.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSummary {
    pub transform: &'static str,
    pub trials: usize,
    pub min_rmsd: f64,
    pub mean_rmsd: f64,
    pub max_rmsd: f64,
}

pub fn execute(args: &TransformArgs, progress: &TrialProgress) -> Result<TrialSummary> {
    if args.trials == 0 {
        return Err(CliError::Argument("at least one trial is required".into()));
    }
    let registry = TransformRegistry::with_builtins()?;
    let transform = load_transform(&registry, &args.config, &args.key)?;
    info!(
        "Loaded '{}' from {:?} (key '{}').",
        transform.name(),
        args.config,
        args.key
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let options = RandomProteinOptions::default();
    let mut deviations = Vec::with_capacity(args.trials);
    for trial in 0..args.trials {
        let protein = random_protein(&mut rng, &options).map_err(HarnessError::from)?;
        let report = run_transform(transform.as_ref(), protein, &mut rng)?;
        let rmsd = check_deviation(report.rmsd).inspect_err(|e| {
            warn!("Trial {} failed the deviation check: {}", trial, e);
        })?;

        if trial == 0 {
            if let Some(dir) = &args.output {
                for path in write_snapshots(&report, dir, "trial_0")? {
                    progress.println(format!("Wrote {}", path.display()));
                }
            }
        }
        deviations.push(rmsd);
        progress.inc();
    }
    progress.finish("✓ Done");

    let min_rmsd = deviations.iter().copied().fold(f64::INFINITY, f64::min);
    let max_rmsd = deviations.iter().copied().fold(0.0, f64::max);
    Ok(TrialSummary {
        transform: transform.name(),
        trials: deviations.len(),
        min_rmsd,
        mean_rmsd: deviations.iter().sum::<f64>() / deviations.len() as f64,
        max_rmsd,
    })
}

pub fn run(args: TransformArgs, quiet: bool) -> Result<String> {
    let progress = if quiet {
        TrialProgress::hidden(args.trials)
    } else {
        TrialProgress::new(args.trials, "Corrupting")
    };
    let summary = execute(&args, &progress)?;
    Ok(format!(
        "'{}' over {} trials: CA RMSD min {:.4} / mean {:.4} / max {:.4} Å",
        summary.transform, summary.trials, summary.min_rmsd, summary.mean_rmsd, summary.max_rmsd
    ))
}
