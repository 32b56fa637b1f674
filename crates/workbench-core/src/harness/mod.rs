//! # Harness Module
//!
//! Test fixtures and the transform runner.
//!
//! - [`fixtures`] - train/finetune configs with test defaults, per-test output
//!   directories and the random test batch
//! - [`runner`] - load a transform from config, apply it, measure CA RMSD and
//!   bound-check the deviation

mod error;
pub mod fixtures;
pub mod runner;

pub use error::HarnessError;
pub use fixtures::{
    ConfigFixture, RunKind, TEST_BATCH_SIZE, TrainerSettings, apply_test_defaults, build_test_batch,
    discover_config_dir,
};
pub use runner::{
    TransformReport, ca_rmsd, check_deviation, load_transform, run_configured_transform,
    run_transform, write_snapshots,
};
