use crate::cli::ComposeArgs;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use workbench::config::{ComposeOptions, ConfigContext};
use workbench::harness::{RunKind, apply_test_defaults, discover_config_dir};

pub fn run(args: ComposeArgs) -> Result<String> {
    let (root_dir, config_dir) = match &args.config_dir {
        Some(dir) => (project_root(dir), dir.clone()),
        None => discover_config_dir(&std::env::current_dir()?)?,
    };
    info!("Composing '{}' from {:?}", args.config_name, config_dir);

    let mut context = ConfigContext::initialize(config_dir)?;
    let mut config = context.compose(
        &args.config_name,
        args.overrides.as_slice(),
        ComposeOptions {
            return_meta: args.with_meta,
        },
    )?;

    if args.test_defaults {
        apply_test_defaults(&mut config, run_kind(&args.config_name), &root_dir)?;
    }
    let config = if args.resolve {
        config.resolve()?
    } else {
        config
    };
    Ok(config.to_yaml()?)
}

/// Project root for an explicit config directory. Without a `.project-root`
/// marker above it, the directory's parent is used.
fn project_root(config_dir: &Path) -> PathBuf {
    match discover_config_dir(config_dir) {
        Ok((root, _)) => root,
        Err(e) => {
            let fallback = config_dir.parent().map(PathBuf::from).unwrap_or_default();
            warn!(
                "No project root found for {:?} ({}); using {:?} as env.paths.root_dir.",
                config_dir, e, fallback
            );
            fallback
        }
    }
}

fn run_kind(config_name: &str) -> RunKind {
    let stem = PathBuf::from(config_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    if stem == "finetune" {
        RunKind::Finetune
    } else {
        RunKind::Train
    }
}
