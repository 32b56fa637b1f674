use super::error::HarnessError;
use crate::config::{ComposeOptions, Config, ConfigContext, ConfigError, ConfigValue, find_root};
use crate::protein::{ProteinBatch, RandomProteinOptions, random_protein};
use rand::Rng;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const PROJECT_ROOT_INDICATOR: &str = ".project-root";
pub const CONFIG_DIR_NAME: &str = "configs";

pub const TEST_BATCH_SIZE: usize = 4;
pub const TEST_EDGE_SPEC: &str = "knn_8";
pub const TEST_EDGE_CACHE: &str = "edge_index";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Train,
    Finetune,
}

impl RunKind {
    pub fn config_name(self) -> &'static str {
        match self {
            RunKind::Train => "train.yaml",
            RunKind::Finetune => "finetune.yaml",
        }
    }

    pub fn overrides(self) -> &'static [&'static str] {
        match self {
            RunKind::Train => &[],
            RunKind::Finetune => &["ckpt_path=."],
        }
    }
}

/// Typed view of the `trainer` section.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TrainerSettings {
    pub max_epochs: u32,
    pub accelerator: String,
    pub devices: u32,
    #[serde(default = "full_fraction")]
    pub limit_train_batches: f64,
    #[serde(default = "full_fraction")]
    pub limit_val_batches: f64,
    #[serde(default = "full_fraction")]
    pub limit_test_batches: f64,
}

fn full_fraction() -> f64 {
    1.0
}

/// Locates the project root (via `.project-root`) and its `configs/` directory.
pub fn discover_config_dir(start: &Path) -> Result<(PathBuf, PathBuf), HarnessError> {
    let root = find_root(start, PROJECT_ROOT_INDICATOR)?;
    let config_dir = root.join(CONFIG_DIR_NAME);
    Ok((root, config_dir))
}

/// Settings every test run uses: one CPU epoch over a fraction of the data,
/// no workers, no printing, no logger.
pub fn apply_test_defaults(
    config: &mut Config,
    kind: RunKind,
    root_dir: &Path,
) -> Result<(), ConfigError> {
    config.open(|c| {
        c.set("env.paths.root_dir", root_dir.to_string_lossy().to_string())?;
        c.set("trainer.max_epochs", 1)?;
        if kind == RunKind::Train {
            c.set("trainer.limit_train_batches", 0.01)?;
            c.set("trainer.limit_val_batches", 0.1)?;
        }
        c.set("trainer.limit_test_batches", 0.1)?;
        c.set("trainer.accelerator", "cpu")?;
        c.set("trainer.devices", 1)?;
        c.set("dataset.datamodule.num_workers", 0)?;
        c.set("dataset.datamodule.pin_memory", false)?;
        c.set("extras.print_config", false)?;
        c.set("extras.enforce_tags", false)?;
        c.set("logger", ConfigValue::Null)
    })
}

/// A composed run config with test defaults, plus the context it came from.
///
/// Per-test copies come from [`ConfigFixture::for_test`]. Dropping the fixture
/// (or calling [`ConfigFixture::clear`]) releases the composition state.
#[derive(Debug)]
pub struct ConfigFixture {
    context: ConfigContext,
    global: Config,
    kind: RunKind,
}

impl ConfigFixture {
    pub fn new(kind: RunKind, config_dir: &Path, root_dir: &Path) -> Result<Self, HarnessError> {
        let mut context = ConfigContext::initialize(config_dir)?;
        let mut global = context.compose(
            kind.config_name(),
            kind.overrides(),
            ComposeOptions { return_meta: true },
        )?;
        apply_test_defaults(&mut global, kind, root_dir)?;
        info!("Prepared {:?} config fixture from {:?}", kind, config_dir);
        Ok(Self {
            context,
            global,
            kind,
        })
    }

    pub fn train(config_dir: &Path, root_dir: &Path) -> Result<Self, HarnessError> {
        Self::new(RunKind::Train, config_dir, root_dir)
    }

    pub fn finetune(config_dir: &Path, root_dir: &Path) -> Result<Self, HarnessError> {
        Self::new(RunKind::Finetune, config_dir, root_dir)
    }

    pub fn kind(&self) -> RunKind {
        self.kind
    }

    pub fn global(&self) -> &Config {
        &self.global
    }

    pub fn context(&self) -> &ConfigContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ConfigContext {
        &mut self.context
    }

    /// A copy of the global config whose output and log directories point at
    /// `tmp_dir`.
    pub fn for_test(&self, tmp_dir: &Path) -> Result<Config, HarnessError> {
        let mut config = self.global.clone();
        let dir = tmp_dir.to_string_lossy().to_string();
        config.open(|c| {
            c.set("env.paths.output_dir", dir.as_str())?;
            c.set("env.paths.log_dir", dir.as_str())
        })?;
        debug!("Per-test config writes to {:?}", tmp_dir);
        Ok(config)
    }

    pub fn trainer(&self) -> Result<TrainerSettings, HarnessError> {
        Ok(self.global.extract("trainer")?)
    }

    pub fn clear(&mut self) {
        self.context.clear();
    }
}

/// Builds `size` random proteins into one batch the way the model tests
/// expect it: membership from `coords`, a cached `knn_8` graph under
/// `edge_index`, `pos` from CA atoms and `x` from residue types.
pub fn build_test_batch<R: Rng + ?Sized>(
    rng: &mut R,
    size: usize,
) -> Result<ProteinBatch, HarnessError> {
    let options = RandomProteinOptions::default();
    let proteins = (0..size)
        .map(|_| random_protein(rng, &options))
        .collect::<Result<Vec<_>, _>>()?;

    let mut batch = ProteinBatch::from_protein_list(proteins, &["coords"])?;
    batch.assign_batch_from("coords")?;
    batch.edges(TEST_EDGE_SPEC, Some(TEST_EDGE_CACHE))?;
    batch.derive_node_features();
    Ok(batch)
}
