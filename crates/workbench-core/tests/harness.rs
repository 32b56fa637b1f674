use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;
use workbench::config::{ComposeOptions, ConfigContext, ConfigError};
use workbench::harness::{
    ConfigFixture, TEST_BATCH_SIZE, build_test_batch, ca_rmsd, check_deviation,
    discover_config_dir, load_transform, run_configured_transform, run_transform,
};
use workbench::protein::{RandomProteinOptions, random_protein};
use workbench::transforms::TransformRegistry;

fn project() -> (PathBuf, PathBuf) {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    discover_config_dir(&manifest).expect("workspace root should carry .project-root")
}

fn torsional_config() -> PathBuf {
    project().1.join("transforms").join("torsional_denoising.yaml")
}

#[test]
fn train_config_uses_test_defaults() {
    let (root, config_dir) = project();
    let fixture = ConfigFixture::train(&config_dir, &root).unwrap();
    let tmp = tempdir().unwrap();
    let cfg = fixture.for_test(tmp.path()).unwrap();

    assert_eq!(cfg.get_i64("trainer.max_epochs").unwrap(), 1);
    assert_eq!(cfg.get_str("trainer.accelerator").unwrap(), "cpu");
    assert_eq!(cfg.get_i64("trainer.devices").unwrap(), 1);
    assert_eq!(cfg.get_f64("trainer.limit_train_batches").unwrap(), 0.01);
    assert_eq!(cfg.get_i64("dataset.datamodule.num_workers").unwrap(), 0);
    assert!(!cfg.get_bool("extras.print_config").unwrap());
    assert!(cfg.get("logger").unwrap().is_null());
    assert_eq!(
        cfg.get_str("env.paths.root_dir").unwrap(),
        root.to_string_lossy()
    );
    assert_eq!(
        cfg.get_str("env.paths.log_dir").unwrap(),
        tmp.path().to_string_lossy()
    );
}

#[test]
fn finetune_config_takes_the_checkpoint_override() {
    let (root, config_dir) = project();
    let fixture = ConfigFixture::finetune(&config_dir, &root).unwrap();
    let tmp = tempdir().unwrap();
    let cfg = fixture.for_test(tmp.path()).unwrap();

    assert_eq!(cfg.get_i64("trainer.max_epochs").unwrap(), 1);
    assert_eq!(cfg.get_str("trainer.accelerator").unwrap(), "cpu");
    assert_eq!(cfg.get_str("ckpt_path").unwrap(), ".");
}

#[test]
fn composed_configs_resolve_every_interpolation() {
    let (root, config_dir) = project();
    let fixture = ConfigFixture::train(&config_dir, &root).unwrap();
    let tmp = tempdir().unwrap();
    let resolved = fixture.for_test(tmp.path()).unwrap().resolve().unwrap();

    let expected = format!("{}/data/cath", root.to_string_lossy());
    assert_eq!(resolved.get_str("dataset.datamodule.path").unwrap(), expected);
    assert_eq!(
        resolved.get_str("trainer.default_root_dir").unwrap(),
        tmp.path().to_string_lossy()
    );
}

#[test]
fn clearing_the_context_resets_composition_state() {
    let (root, config_dir) = project();
    let mut fixture = ConfigFixture::train(&config_dir, &root).unwrap();
    assert!(fixture.context().compositions() >= 1);
    assert!(fixture.context().cached_documents() > 0);

    let tmp = tempdir().unwrap();
    let mut cfg = fixture.for_test(tmp.path()).unwrap();
    cfg.open(|c| c.set("trainer.max_epochs", 7)).unwrap();
    fixture.clear();
    assert_eq!(fixture.context().cached_documents(), 0);
    assert_eq!(fixture.context().compositions(), 0);

    let fresh = fixture
        .context_mut()
        .compose("train.yaml", &[] as &[&str], ComposeOptions::default())
        .unwrap();
    assert_eq!(fixture.context().compositions(), 1);
    assert!(fixture.context().cached_documents() > 0);
    assert_eq!(fresh.get_i64("trainer.max_epochs").unwrap(), 150);
    assert_eq!(fresh.get_str("trainer.accelerator").unwrap(), "gpu");
    assert_eq!(
        fresh.get_str("env.paths.output_dir").unwrap(),
        "${env.paths.log_dir}/${env.run_name}/runs"
    );
    assert!(!fresh.contains("meta"));
}

#[test]
fn cached_documents_are_only_reread_after_clearing() {
    let dir = tempdir().unwrap();
    let primary = dir.path().join("run.yaml");
    fs::write(&primary, "trainer:\n  max_epochs: 1\n").unwrap();
    let mut context = ConfigContext::initialize(dir.path()).unwrap();
    let compose = |context: &mut ConfigContext| {
        context
            .compose("run.yaml", &[] as &[&str], ComposeOptions::default())
            .unwrap()
            .get_i64("trainer.max_epochs")
            .unwrap()
    };
    assert_eq!(compose(&mut context), 1);

    fs::write(&primary, "trainer:\n  max_epochs: 2\n").unwrap();
    assert_eq!(compose(&mut context), 1, "stale document served from the cache");

    context.clear();
    assert_eq!(compose(&mut context), 2);
}

#[test]
fn closed_configs_reject_unknown_keys() {
    let (_, config_dir) = project();
    ConfigContext::scoped(&config_dir, |ctx| {
        let mut cfg = ctx.compose("train.yaml", &["trainer=cpu"], ComposeOptions::default())?;
        assert!(matches!(
            cfg.set("trainer.not_a_setting", 1),
            Err(ConfigError::UnknownKey { .. })
        ));
        cfg.open(|c| c.set("trainer.not_a_setting", 1))?;
        assert_eq!(cfg.get_i64("trainer.not_a_setting")?, 1);
        Ok(())
    })
    .unwrap();
}

#[test]
fn finetune_without_checkpoint_is_mandatory_missing() {
    let (_, config_dir) = project();
    let mut ctx = ConfigContext::initialize(&config_dir).unwrap();
    let cfg = ctx
        .compose("finetune.yaml", &[] as &[&str], ComposeOptions::default())
        .unwrap();
    assert!(matches!(
        cfg.get_str("ckpt_path"),
        Err(ConfigError::MandatoryMissing { .. })
    ));
}

#[test]
fn test_batch_membership_matches_node_counts() {
    let mut rng = StdRng::seed_from_u64(42);
    let batch = build_test_batch(&mut rng, TEST_BATCH_SIZE).unwrap();

    assert_eq!(
        batch.batch.len(),
        batch.node_counts().iter().sum::<usize>()
    );
    assert!(batch.batch.iter().all(|&g| g < TEST_BATCH_SIZE));
    assert_eq!(batch.coords.len(), batch.batch.len());

    let edges = batch.cached_edges("edge_index").unwrap();
    for (source, target) in edges.iter() {
        assert_ne!(source, target);
        assert_eq!(batch.batch[source], batch.batch[target]);
    }
    for (graph, count) in batch.node_counts().into_iter().enumerate() {
        let expected = 8.min(count - 1);
        let start = batch.ptr[graph];
        for node in start..start + count {
            let incoming = edges.iter().filter(|&(_, t)| t == node).count();
            assert_eq!(incoming, expected);
        }
    }
}

#[test]
fn torsional_transform_moves_ca_atoms_in_every_trial() {
    let registry = TransformRegistry::with_builtins().unwrap();
    let transform = load_transform(&registry, &torsional_config(), "torsional_denoising").unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let options = RandomProteinOptions::default();

    for trial in 0..100 {
        let protein = random_protein(&mut rng, &options).unwrap();
        let report = run_transform(transform.as_ref(), protein, &mut rng).unwrap();
        let rmsd = check_deviation(report.rmsd)
            .unwrap_or_else(|e| panic!("trial {}: {}", trial, e));
        assert!(rmsd.is_finite() && rmsd > 0.0);
    }
}

#[test]
fn instantiated_transform_changes_a_copied_protein() {
    let registry = TransformRegistry::with_builtins().unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let a = random_protein(&mut rng, &RandomProteinOptions::default()).unwrap();
    let b = a.clone();

    let report = run_configured_transform(
        &registry,
        &torsional_config(),
        "torsional_denoising",
        a,
        &mut rng,
    )
    .unwrap();
    assert!(ca_rmsd(&report.output, &b).unwrap() > 0.0);
}

#[test]
fn every_shipped_transform_config_instantiates() {
    let registry = TransformRegistry::with_builtins().unwrap();
    let dir = project().1.join("transforms");
    for (file, key) in [
        ("torsional_denoising.yaml", "torsional_denoising"),
        ("structure_denoising.yaml", "structure_denoising"),
        ("sequence_denoising.yaml", "sequence_denoising"),
    ] {
        let transform = load_transform(&registry, &dir.join(file), key);
        assert!(transform.is_ok(), "{}: {:?}", file, transform.err());
    }
}
