//! `${...}` interpolation over a config tree.
//!
//! Two forms are understood: absolute key references (`${env.paths.root_dir}`)
//! and the environment resolver (`${oc.env:NAME}` / `${oc.env:NAME,default}`).
//! A string consisting of exactly one interpolation takes the type of the
//! referenced value; anything else is rendered into a string.

use super::error::ConfigError;
use super::value::{ConfigMap, ConfigValue};

const ENV_RESOLVER: &str = "oc.env:";

enum Segment<'a> {
    Literal(&'a str),
    Reference(&'a str),
}

fn parse_segments(value: &str) -> Result<Vec<Segment<'_>>, ConfigError> {
    let mut segments = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        if start > 0 {
            segments.push(Segment::Literal(&rest[..start]));
        }
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| ConfigError::InterpolationSyntax {
                value: value.to_string(),
            })?;
        let inner = after[..end].trim();
        if inner.is_empty() || inner.contains("${") {
            return Err(ConfigError::InterpolationSyntax {
                value: value.to_string(),
            });
        }
        segments.push(Segment::Reference(inner));
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}

fn lookup<'a>(root: &'a ConfigMap, key: &str) -> Option<&'a ConfigValue> {
    let mut parts = key.split('.');
    let mut current = root.get(parts.next()?)?;
    for part in parts {
        current = match current {
            ConfigValue::Map(map) => map.get(part)?,
            ConfigValue::List(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn resolve_env(spec: &str) -> Result<ConfigValue, ConfigError> {
    let (name, default) = match spec.split_once(',') {
        Some((name, default)) => (name.trim(), Some(default.trim())),
        None => (spec.trim(), None),
    };
    match std::env::var(name) {
        Ok(value) => Ok(ConfigValue::String(value)),
        Err(_) => match default {
            Some(default) => Ok(ConfigValue::String(default.to_string())),
            None => Err(ConfigError::EnvVarMissing {
                name: name.to_string(),
            }),
        },
    }
}

fn resolve_reference(
    root: &ConfigMap,
    reference: &str,
    stack: &mut Vec<String>,
) -> Result<ConfigValue, ConfigError> {
    if let Some(spec) = reference.strip_prefix(ENV_RESOLVER) {
        return resolve_env(spec);
    }
    if stack.iter().any(|k| k == reference) {
        return Err(ConfigError::InterpolationCycle {
            key: reference.to_string(),
        });
    }
    let raw = lookup(root, reference).ok_or_else(|| ConfigError::InterpolationKey {
        key: reference.to_string(),
    })?;
    if raw.is_missing() {
        return Err(ConfigError::MandatoryMissing {
            key: reference.to_string(),
        });
    }
    stack.push(reference.to_string());
    let resolved = resolve_value(root, raw, stack);
    stack.pop();
    resolved
}

fn resolve_string(
    root: &ConfigMap,
    value: &str,
    stack: &mut Vec<String>,
) -> Result<ConfigValue, ConfigError> {
    if !value.contains("${") {
        return Ok(ConfigValue::String(value.to_string()));
    }
    let segments = parse_segments(value)?;
    if let [Segment::Reference(reference)] = segments.as_slice() {
        return resolve_reference(root, reference, stack);
    }
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Reference(reference) => {
                out.push_str(&resolve_reference(root, reference, stack)?.to_string())
            }
        }
    }
    Ok(ConfigValue::String(out))
}

fn resolve_value(
    root: &ConfigMap,
    value: &ConfigValue,
    stack: &mut Vec<String>,
) -> Result<ConfigValue, ConfigError> {
    match value {
        ConfigValue::String(s) => resolve_string(root, s, stack),
        ConfigValue::List(items) => Ok(ConfigValue::List(
            items
                .iter()
                .map(|item| resolve_value(root, item, stack))
                .collect::<Result<_, _>>()?,
        )),
        ConfigValue::Map(map) => {
            let mut resolved = ConfigMap::new();
            for (key, item) in map.iter() {
                resolved.insert(key, resolve_value(root, item, stack)?);
            }
            Ok(ConfigValue::Map(resolved))
        }
        other => Ok(other.clone()),
    }
}

pub(crate) fn resolve_map(root: &ConfigMap) -> Result<ConfigMap, ConfigError> {
    let mut resolved = ConfigMap::new();
    let mut stack = Vec::new();
    for (key, value) in root.iter() {
        resolved.insert(key, resolve_value(root, value, &mut stack)?);
    }
    Ok(resolved)
}
