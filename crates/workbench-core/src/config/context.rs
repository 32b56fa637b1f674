use super::error::ConfigError;
use super::loader::read_mapping;
use super::overrides::Override;
use super::tree::Config;
use super::value::{ConfigMap, ConfigValue};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, trace};

const DEFAULTS_KEY: &str = "defaults";
const SELF_ENTRY: &str = "_self_";
const OPTIONAL_PREFIX: &str = "optional ";
const OVERRIDE_PREFIX: &str = "override ";
const CONFIG_EXTENSIONS: [&str; 3] = ["yaml", "yml", "toml"];

/// Key under which composition metadata is stored when requested.
pub const META_KEY: &str = "meta";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Attach a `meta` node describing how the config was composed.
    pub return_meta: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum DefaultsEntry {
    SelfEntry,
    Include(String),
    Group {
        group: String,
        option: Option<String>,
        optional: bool,
    },
}

#[derive(Debug, Default)]
struct CompositionState {
    choices: HashMap<String, Option<String>>,
    appended: Vec<(String, String)>,
    consumed: HashSet<String>,
    recorded: Vec<(String, String)>,
    visiting: Vec<PathBuf>,
}

/// Explicit composition context.
///
/// Owns the config search directory and the cache of parsed documents that
/// composition builds up. The cache is dropped by [`ConfigContext::clear`] and
/// when the context goes out of scope, so compositions made through different
/// contexts never observe each other.
#[derive(Debug)]
pub struct ConfigContext {
    config_dir: PathBuf,
    documents: HashMap<PathBuf, ConfigMap>,
    compositions: usize,
}

fn join_group(parent: &str, group: &str) -> String {
    if parent.is_empty() {
        group.to_string()
    } else {
        format!("{}/{}", parent, group)
    }
}

fn nest(group: &str, content: ConfigMap) -> ConfigMap {
    group.rsplit('/').fold(content, |inner, part| {
        let mut outer = ConfigMap::new();
        outer.insert(part, ConfigValue::Map(inner));
        outer
    })
}

fn parse_defaults(
    file: &Path,
    value: Option<ConfigValue>,
) -> Result<Vec<DefaultsEntry>, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidDefaults {
        path: file.to_string_lossy().to_string(),
        reason,
    };

    let items = match value {
        None => return Ok(Vec::new()),
        Some(ConfigValue::List(items)) => items,
        Some(other) => {
            return Err(invalid(format!(
                "expected a list, found {}",
                other.type_name()
            )));
        }
    };

    let mut entries: Vec<DefaultsEntry> = Vec::with_capacity(items.len());
    for item in items {
        match item {
            ConfigValue::String(name) if name == SELF_ENTRY => entries.push(DefaultsEntry::SelfEntry),
            ConfigValue::String(name) => entries.push(DefaultsEntry::Include(name)),
            ConfigValue::Map(map) if map.len() == 1 => {
                let Some((raw_key, raw_option)) = map.iter().next() else {
                    continue;
                };
                let option = match raw_option {
                    ConfigValue::String(s) => Some(s.clone()),
                    ConfigValue::Null => None,
                    other => {
                        return Err(invalid(format!(
                            "option for '{}' must be a string or null, found {}",
                            raw_key,
                            other.type_name()
                        )));
                    }
                };
                let raw_key = raw_key.trim();
                if let Some(group) = raw_key.strip_prefix(OVERRIDE_PREFIX) {
                    let group = group.trim();
                    let existing = entries.iter_mut().find_map(|entry| match entry {
                        DefaultsEntry::Group {
                            group: g,
                            option: o,
                            ..
                        } if g.as_str() == group => Some(o),
                        _ => None,
                    });
                    match existing {
                        Some(slot) => *slot = option,
                        None => {
                            return Err(invalid(format!(
                                "'override {}' does not match an earlier entry",
                                group
                            )));
                        }
                    }
                    continue;
                }
                let (group, optional) = match raw_key.strip_prefix(OPTIONAL_PREFIX) {
                    Some(group) => (group.trim().to_string(), true),
                    None => (raw_key.to_string(), false),
                };
                entries.push(DefaultsEntry::Group {
                    group,
                    option,
                    optional,
                });
            }
            other => {
                return Err(invalid(format!(
                    "unsupported entry of type {}",
                    other.type_name()
                )));
            }
        }
    }
    Ok(entries)
}

impl ConfigContext {
    /// Creates a context rooted at `config_dir`, which must exist.
    pub fn initialize(config_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let config_dir = config_dir.into();
        if !config_dir.is_dir() {
            return Err(ConfigError::FileNotFound {
                path: config_dir.to_string_lossy().to_string(),
            });
        }
        debug!("Initialized config context at {:?}", config_dir);
        Ok(Self {
            config_dir,
            documents: HashMap::new(),
            compositions: 0,
        })
    }

    /// Runs `body` with a fresh context that is released when `body` returns.
    pub fn scoped<T, F>(config_dir: impl Into<PathBuf>, body: F) -> Result<T, ConfigError>
    where
        F: FnOnce(&mut ConfigContext) -> Result<T, ConfigError>,
    {
        let mut context = Self::initialize(config_dir)?;
        body(&mut context)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn cached_documents(&self) -> usize {
        self.documents.len()
    }

    pub fn compositions(&self) -> usize {
        self.compositions
    }

    /// Drops all composition state held by this context.
    pub fn clear(&mut self) {
        if !self.documents.is_empty() || self.compositions > 0 {
            debug!(
                "Clearing config context ({} cached documents, {} compositions)",
                self.documents.len(),
                self.compositions
            );
        }
        self.documents.clear();
        self.compositions = 0;
    }

    fn document(&mut self, path: &Path) -> Result<ConfigMap, ConfigError> {
        if let Some(doc) = self.documents.get(path) {
            trace!("Config document cache hit: {:?}", path);
            return Ok(doc.clone());
        }
        let doc = read_mapping(path)?;
        self.documents.insert(path.to_path_buf(), doc.clone());
        Ok(doc)
    }

    fn resolve_option(&self, group: &str, option: &str) -> Option<PathBuf> {
        let base = self.config_dir.join(group).join(option);
        if base.extension().is_some() && base.is_file() {
            return Some(base);
        }
        CONFIG_EXTENSIONS
            .iter()
            .map(|ext| {
                let mut candidate = base.clone().into_os_string();
                candidate.push(".");
                candidate.push(ext);
                PathBuf::from(candidate)
            })
            .find(|candidate| candidate.is_file())
    }

    fn is_group(&self, key: &str) -> bool {
        self.config_dir.join(key.replace('.', "/")).is_dir()
    }

    fn compose_file(
        &mut self,
        file: &Path,
        group_dir: &str,
        state: &mut CompositionState,
        primary: bool,
    ) -> Result<ConfigMap, ConfigError> {
        if state.visiting.iter().any(|p| p == file) {
            return Err(ConfigError::InvalidDefaults {
                path: file.to_string_lossy().to_string(),
                reason: "the defaults list includes itself".to_string(),
            });
        }
        state.visiting.push(file.to_path_buf());

        let mut document = self.document(file)?;
        let mut entries = parse_defaults(file, document.remove(DEFAULTS_KEY))?;
        if primary {
            for (group, option) in state.appended.clone() {
                entries.push(DefaultsEntry::Group {
                    group,
                    option: Some(option),
                    optional: false,
                });
            }
        }
        if !entries.contains(&DefaultsEntry::SelfEntry) {
            entries.push(DefaultsEntry::SelfEntry);
        }

        let mut composed = ConfigMap::new();
        let mut own = Some(document);
        for entry in entries {
            match entry {
                DefaultsEntry::SelfEntry => {
                    if let Some(own) = own.take() {
                        composed.merge(own);
                    }
                }
                DefaultsEntry::Include(name) => {
                    let path = self.resolve_option(group_dir, &name).ok_or_else(|| {
                        ConfigError::UnknownGroupOption {
                            group: if group_dir.is_empty() {
                                "<root>".to_string()
                            } else {
                                group_dir.to_string()
                            },
                            option: name.clone(),
                        }
                    })?;
                    let included = self.compose_file(&path, group_dir, state, false)?;
                    composed.merge(included);
                }
                DefaultsEntry::Group {
                    group,
                    option,
                    optional,
                } => {
                    let full = join_group(group_dir, &group);
                    let option = match state.choices.get(&full) {
                        Some(choice) => {
                            state.consumed.insert(full.clone());
                            choice.clone()
                        }
                        None => option,
                    };
                    let Some(option) = option else {
                        trace!("Config group '{}' disabled", full);
                        continue;
                    };
                    let Some(path) = self.resolve_option(&full, &option) else {
                        if optional {
                            trace!("Optional config group '{}={}' not found", full, option);
                            continue;
                        }
                        return Err(ConfigError::UnknownGroupOption {
                            group: full,
                            option,
                        });
                    };
                    state.recorded.push((full.clone(), option));
                    let content = self.compose_file(&path, &full, state, false)?;
                    composed.merge(nest(&group, content));
                }
            }
        }

        state.visiting.pop();
        Ok(composed)
    }

    fn apply_override(config: &mut Config, item: &Override) -> Result<(), ConfigError> {
        match item {
            Override::Assign { key, value } => {
                if !config.contains(key) {
                    return Err(ConfigError::UnknownKey { key: key.clone() });
                }
                config.open(|c| c.set(key, value.clone()))
            }
            Override::Append { key, value } => {
                if config.contains(key) {
                    return Err(ConfigError::KeyExists { key: key.clone() });
                }
                config.open(|c| c.set(key, value.clone()))
            }
            Override::Force { key, value } => config.open(|c| c.set(key, value.clone())),
            Override::Delete { key } => config.remove(key).map(|_| ()),
        }
    }

    /// Composes `config_name` from its defaults list and applies `overrides`.
    ///
    /// The returned config is closed: later edits to unknown keys need an
    /// open-edit scope.
    #[instrument(level = "debug", skip(self, overrides, options), fields(dir = ?self.config_dir))]
    pub fn compose<S: AsRef<str>>(
        &mut self,
        config_name: &str,
        overrides: &[S],
        options: ComposeOptions,
    ) -> Result<Config, ConfigError> {
        let parsed = Override::parse_all(overrides)?;

        let mut state = CompositionState::default();
        let mut group_overrides = Vec::new();
        let mut value_overrides = Vec::new();
        for item in parsed {
            if !self.is_group(item.key()) {
                value_overrides.push(item);
                continue;
            }
            let group = item.key().replace('.', "/");
            match &item {
                Override::Assign { value, .. } | Override::Force { value, .. } => {
                    let choice = match value {
                        ConfigValue::Null => None,
                        ConfigValue::String(s) => Some(s.clone()),
                        other => Some(other.to_string()),
                    };
                    state.choices.insert(group, choice);
                }
                Override::Append { value, .. } => {
                    state.appended.push((group, value.to_string()));
                }
                Override::Delete { .. } => {
                    state.choices.insert(group, None);
                }
            }
            group_overrides.push(item);
        }

        let primary = self.resolve_option("", config_name).ok_or_else(|| {
            ConfigError::FileNotFound {
                path: self
                    .config_dir
                    .join(config_name)
                    .to_string_lossy()
                    .to_string(),
            }
        })?;
        let composed = self.compose_file(&primary, "", &mut state, true)?;

        for item in &group_overrides {
            let group = item.key().replace('.', "/");
            let appended = matches!(item, Override::Append { .. });
            if !appended && !state.consumed.contains(&group) {
                return Err(ConfigError::InvalidOverride {
                    raw: item.to_string(),
                    reason: format!("no entry for group '{}' in the defaults list", group),
                });
            }
        }

        let mut config = Config::new(composed);
        config.close();
        for item in &value_overrides {
            Self::apply_override(&mut config, item)?;
        }

        if options.return_meta {
            let mut meta = ConfigMap::new();
            meta.insert("config_name", config_name.into());
            meta.insert(
                "config_dir",
                self.config_dir.to_string_lossy().to_string().into(),
            );
            meta.insert(
                "overrides",
                ConfigValue::List(
                    group_overrides
                        .iter()
                        .chain(value_overrides.iter())
                        .map(|o| ConfigValue::String(o.to_string()))
                        .collect(),
                ),
            );
            meta.insert(
                "choices",
                ConfigValue::Map(
                    state
                        .recorded
                        .into_iter()
                        .map(|(group, option)| (group, ConfigValue::String(option)))
                        .collect(),
                ),
            );
            config.open(|c| c.set(META_KEY, meta))?;
        }

        self.compositions += 1;
        info!(
            "Composed '{}' with {} override(s).",
            config_name,
            group_overrides.len() + value_overrides.len()
        );
        Ok(config)
    }
}

impl Drop for ConfigContext {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn config_tree() -> TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "train.yaml",
            r#"
defaults:
  - _self_
  - env: default
  - trainer: gpu
  - logger: csv
  - optional local: absent

task_name: train
ckpt_path: null
trainer:
  max_epochs: 999
"#,
        );
        write(
            root,
            "finetune.yaml",
            r#"
defaults:
  - trainer: gpu
task_name: finetune
ckpt_path: '???'
"#,
        );
        write(root, "env/default.yaml", "defaults:\n  - paths: default\nseed: 7\n");
        write(
            root,
            "env/paths/default.yaml",
            "root_dir: /work\nlog_dir: ${env.paths.root_dir}/logs\n",
        );
        write(
            root,
            "trainer/default.yaml",
            "max_epochs: 150\naccelerator: cpu\ndevices: 1\n",
        );
        write(
            root,
            "trainer/gpu.yaml",
            "defaults:\n  - default\naccelerator: gpu\n",
        );
        write(
            root,
            "trainer/cpu.yaml",
            "defaults:\n  - default\naccelerator: cpu\n",
        );
        write(root, "logger/csv.yaml", "csv:\n  save_dir: logs\n");
        dir
    }

    #[test]
    fn composes_groups_under_their_packages() {
        let dir = config_tree();
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        let cfg = ctx
            .compose("train.yaml", &[] as &[&str], ComposeOptions::default())
            .unwrap();

        assert!(cfg.is_closed());
        assert_eq!(cfg.get_str("task_name").unwrap(), "train");
        assert_eq!(cfg.get_i64("env.seed").unwrap(), 7);
        assert_eq!(cfg.get_str("env.paths.root_dir").unwrap(), "/work");
        assert_eq!(cfg.get_str("trainer.accelerator").unwrap(), "gpu");
        assert_eq!(cfg.get_i64("trainer.devices").unwrap(), 1);
        assert_eq!(cfg.get_str("logger.csv.save_dir").unwrap(), "logs");
        assert!(!cfg.contains("defaults"));
        assert!(!cfg.contains("local"));
    }

    #[test]
    fn self_position_controls_merge_order() {
        let dir = config_tree();
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        let cfg = ctx
            .compose("train.yaml", &[] as &[&str], ComposeOptions::default())
            .unwrap();
        // `_self_` comes first in train.yaml, so the trainer group wins.
        assert_eq!(cfg.get_i64("trainer.max_epochs").unwrap(), 150);
    }

    #[test]
    fn implicit_self_is_merged_last() {
        let dir = config_tree();
        write(
            dir.path(),
            "last.yaml",
            "defaults:\n  - trainer: cpu\ntrainer:\n  max_epochs: 5\n",
        );
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        let cfg = ctx
            .compose("last", &[] as &[&str], ComposeOptions::default())
            .unwrap();
        assert_eq!(cfg.get_i64("trainer.max_epochs").unwrap(), 5);
    }

    #[test]
    fn value_and_group_overrides_apply_in_order() {
        let dir = config_tree();
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        let cfg = ctx
            .compose(
                "train.yaml",
                &["trainer=cpu", "trainer.max_epochs=1", "trainer.max_epochs=2"],
                ComposeOptions::default(),
            )
            .unwrap();
        assert_eq!(cfg.get_str("trainer.accelerator").unwrap(), "cpu");
        assert_eq!(cfg.get_i64("trainer.max_epochs").unwrap(), 2);
    }

    #[test]
    fn mandatory_value_can_be_supplied_by_override() {
        let dir = config_tree();
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        let cfg = ctx
            .compose("finetune.yaml", &["ckpt_path=."], ComposeOptions::default())
            .unwrap();
        assert_eq!(cfg.get_str("ckpt_path").unwrap(), ".");

        let cfg = ctx
            .compose("finetune.yaml", &[] as &[&str], ComposeOptions::default())
            .unwrap();
        assert!(matches!(
            cfg.get_str("ckpt_path"),
            Err(ConfigError::MandatoryMissing { .. })
        ));
    }

    #[test]
    fn unknown_keys_need_a_plus_prefix() {
        let dir = config_tree();
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        let err = ctx
            .compose("train.yaml", &["trainer.precision=16"], ComposeOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { .. }));

        let cfg = ctx
            .compose("train.yaml", &["+trainer.precision=16"], ComposeOptions::default())
            .unwrap();
        assert_eq!(cfg.get_i64("trainer.precision").unwrap(), 16);

        let err = ctx
            .compose("train.yaml", &["+trainer.devices=2"], ComposeOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::KeyExists { .. }));
    }

    #[test]
    fn groups_can_be_disabled_and_deleted() {
        let dir = config_tree();
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        let cfg = ctx
            .compose("train.yaml", &["logger=null"], ComposeOptions::default())
            .unwrap();
        assert!(!cfg.contains("logger"));

        let cfg = ctx
            .compose("train.yaml", &["~logger"], ComposeOptions::default())
            .unwrap();
        assert!(!cfg.contains("logger"));
    }

    #[test]
    fn unknown_group_option_is_reported() {
        let dir = config_tree();
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        let err = ctx
            .compose("train.yaml", &["trainer=tpu"], ComposeOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownGroupOption { ref group, ref option } if group == "trainer" && option == "tpu"
        ));
    }

    #[test]
    fn missing_primary_config_names_the_path() {
        let dir = config_tree();
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        let err = ctx
            .compose("nope.yaml", &[] as &[&str], ComposeOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { ref path } if path.ends_with("nope.yaml")));
    }

    #[test]
    fn meta_node_describes_the_composition() {
        let dir = config_tree();
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        let cfg = ctx
            .compose(
                "train.yaml",
                &["trainer=cpu", "task_name=debug"],
                ComposeOptions { return_meta: true },
            )
            .unwrap();
        assert_eq!(cfg.get_str("meta.config_name").unwrap(), "train.yaml");
        assert_eq!(
            cfg.get("meta.overrides").unwrap().as_list().unwrap().len(),
            2
        );
        let choices = cfg.get_map("meta.choices").unwrap();
        assert_eq!(choices.get("trainer").and_then(ConfigValue::as_str), Some("cpu"));
        assert_eq!(
            choices.get("env/paths").and_then(ConfigValue::as_str),
            Some("default")
        );
    }

    #[test]
    fn composed_config_resolves_interpolations() {
        let dir = config_tree();
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        let cfg = ctx
            .compose("train.yaml", &[] as &[&str], ComposeOptions::default())
            .unwrap()
            .resolve()
            .unwrap();
        assert_eq!(cfg.get_str("env.paths.log_dir").unwrap(), "/work/logs");
    }

    #[test]
    fn clear_drops_cached_documents() {
        let dir = config_tree();
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        ctx.compose("train.yaml", &[] as &[&str], ComposeOptions::default())
            .unwrap();
        assert!(ctx.cached_documents() > 0);
        assert_eq!(ctx.compositions(), 1);

        ctx.clear();
        assert_eq!(ctx.cached_documents(), 0);
        assert_eq!(ctx.compositions(), 0);
    }

    #[test]
    fn cleared_context_sees_updated_files() {
        let dir = config_tree();
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        ctx.compose("train.yaml", &[] as &[&str], ComposeOptions::default())
            .unwrap();

        write(dir.path(), "logger/csv.yaml", "csv:\n  save_dir: elsewhere\n");
        let cached = ctx
            .compose("train.yaml", &[] as &[&str], ComposeOptions::default())
            .unwrap();
        assert_eq!(cached.get_str("logger.csv.save_dir").unwrap(), "logs");

        ctx.clear();
        let fresh = ctx
            .compose("train.yaml", &[] as &[&str], ComposeOptions::default())
            .unwrap();
        assert_eq!(fresh.get_str("logger.csv.save_dir").unwrap(), "elsewhere");
    }

    #[test]
    fn scoped_context_returns_the_body_result() {
        let dir = config_tree();
        let accelerator = ConfigContext::scoped(dir.path(), |ctx| {
            let cfg = ctx.compose("train.yaml", &["trainer=cpu"], ComposeOptions::default())?;
            Ok(cfg.get_str("trainer.accelerator")?.to_string())
        })
        .unwrap();
        assert_eq!(accelerator, "cpu");
    }

    #[test]
    fn initialize_rejects_missing_directory() {
        let err = ConfigContext::initialize("/definitely/not/a/config/dir").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn invalid_defaults_list_is_reported() {
        let dir = config_tree();
        write(dir.path(), "broken.yaml", "defaults: trainer\n");
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        let err = ctx
            .compose("broken", &[] as &[&str], ComposeOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDefaults { .. }));
    }

    #[test]
    fn override_entries_in_defaults_replace_earlier_choices() {
        let dir = config_tree();
        write(
            dir.path(),
            "swap.yaml",
            "defaults:\n  - trainer: gpu\n  - override trainer: cpu\n",
        );
        let mut ctx = ConfigContext::initialize(dir.path()).unwrap();
        let cfg = ctx
            .compose("swap", &[] as &[&str], ComposeOptions::default())
            .unwrap();
        assert_eq!(cfg.get_str("trainer.accelerator").unwrap(), "cpu");
    }
}
