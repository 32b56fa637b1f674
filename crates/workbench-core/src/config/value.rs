use std::fmt;

/// Marker used in config files for a value that must be supplied before use.
pub const MISSING_MARKER: &str = "???";

/// A single node of a structured configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConfigValue {
    #[default]
    Null,
    /// A mandatory value that has not been provided yet (`???`).
    Missing,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ConfigValue>),
    Map(ConfigMap),
}

/// An insertion-ordered mapping from string keys to config values.
///
/// Config documents are small, so lookups are linear scans; preserving the
/// source order keeps rendered configs readable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigMap {
    entries: Vec<(String, ConfigValue)>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ConfigValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Inserts or replaces a value, returning the previous one.
    ///
    /// Replacing keeps the key at its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) -> Option<ConfigValue> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut ConfigValue)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Deep-merges `other` into `self`. Mappings merge key by key, every other
    /// value in `other` replaces what was there.
    pub fn merge(&mut self, other: ConfigMap) {
        for (key, incoming) in other.entries {
            match (self.get_mut(&key), incoming) {
                (Some(ConfigValue::Map(existing)), ConfigValue::Map(incoming)) => {
                    existing.merge(incoming);
                }
                (_, incoming) => {
                    self.insert(key, incoming);
                }
            }
        }
    }
}

impl FromIterator<(String, ConfigValue)> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        let mut map = ConfigMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl ConfigValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Missing => "missing",
            ConfigValue::Bool(_) => "a boolean",
            ConfigValue::Integer(_) => "an integer",
            ConfigValue::Float(_) => "a float",
            ConfigValue::String(_) => "a string",
            ConfigValue::List(_) => "a list",
            ConfigValue::Map(_) => "a mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ConfigValue::Missing)
    }

    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut ConfigMap> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats; `1` in a config is a valid `1.0`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn from_yaml(value: serde_yaml::Value) -> Result<Self, String> {
        Ok(match value {
            serde_yaml::Value::Null => ConfigValue::Null,
            serde_yaml::Value::Bool(b) => ConfigValue::Bool(b),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigValue::Integer(i),
                None => ConfigValue::Float(
                    n.as_f64()
                        .ok_or_else(|| format!("unrepresentable number {}", n))?,
                ),
            },
            serde_yaml::Value::String(s) if s == MISSING_MARKER => ConfigValue::Missing,
            serde_yaml::Value::String(s) => ConfigValue::String(s),
            serde_yaml::Value::Sequence(items) => ConfigValue::List(
                items
                    .into_iter()
                    .map(ConfigValue::from_yaml)
                    .collect::<Result<_, _>>()?,
            ),
            serde_yaml::Value::Mapping(mapping) => {
                let mut map = ConfigMap::new();
                for (k, v) in mapping {
                    let key = match k {
                        serde_yaml::Value::String(s) => s,
                        serde_yaml::Value::Number(n) => n.to_string(),
                        serde_yaml::Value::Bool(b) => b.to_string(),
                        other => return Err(format!("unsupported mapping key {:?}", other)),
                    };
                    map.insert(key, ConfigValue::from_yaml(v)?);
                }
                ConfigValue::Map(map)
            }
            serde_yaml::Value::Tagged(tagged) => ConfigValue::from_yaml(tagged.value)?,
        })
    }

    pub fn from_toml(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) if s == MISSING_MARKER => ConfigValue::Missing,
            toml::Value::String(s) => ConfigValue::String(s),
            toml::Value::Integer(i) => ConfigValue::Integer(i),
            toml::Value::Float(f) => ConfigValue::Float(f),
            toml::Value::Boolean(b) => ConfigValue::Bool(b),
            toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
            toml::Value::Array(items) => {
                ConfigValue::List(items.into_iter().map(ConfigValue::from_toml).collect())
            }
            toml::Value::Table(table) => ConfigValue::Map(
                table
                    .into_iter()
                    .map(|(k, v)| (k, ConfigValue::from_toml(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_yaml(&self) -> serde_yaml::Value {
        match self {
            ConfigValue::Null => serde_yaml::Value::Null,
            ConfigValue::Missing => serde_yaml::Value::String(MISSING_MARKER.to_string()),
            ConfigValue::Bool(b) => serde_yaml::Value::Bool(*b),
            ConfigValue::Integer(i) => serde_yaml::Value::Number((*i).into()),
            ConfigValue::Float(f) => serde_yaml::Value::Number((*f).into()),
            ConfigValue::String(s) => serde_yaml::Value::String(s.clone()),
            ConfigValue::List(items) => {
                serde_yaml::Value::Sequence(items.iter().map(ConfigValue::to_yaml).collect())
            }
            ConfigValue::Map(map) => serde_yaml::Value::Mapping(
                map.iter()
                    .map(|(k, v)| (serde_yaml::Value::String(k.to_string()), v.to_yaml()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for ConfigValue {
    /// Scalars render bare, the way they appear inside interpolated strings.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Null => write!(f, "None"),
            ConfigValue::Missing => write!(f, "{}", MISSING_MARKER),
            ConfigValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            ConfigValue::Integer(i) => write!(f, "{}", i),
            ConfigValue::Float(x) => write!(f, "{}", x),
            ConfigValue::String(s) => write!(f, "{}", s),
            ConfigValue::List(_) | ConfigValue::Map(_) => {
                let rendered = serde_yaml::to_string(&self.to_yaml()).map_err(|_| fmt::Error)?;
                write!(f, "{}", rendered.trim_end())
            }
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Integer(v)
    }
}

impl From<i32> for ConfigValue {
    fn from(v: i32) -> Self {
        ConfigValue::Integer(v as i64)
    }
}

impl From<usize> for ConfigValue {
    fn from(v: usize) -> Self {
        ConfigValue::Integer(v as i64)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Float(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::String(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::String(v)
    }
}

impl From<ConfigMap> for ConfigValue {
    fn from(v: ConfigMap) -> Self {
        ConfigValue::Map(v)
    }
}

impl<T: Into<ConfigValue>> From<Option<T>> for ConfigValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ConfigValue::Null)
    }
}
