use super::error::TransformError;
use crate::config::{ConfigMap, ConfigValue};

/// Parameters of one transform node (everything except keys starting with
/// `_`), with typed accessors that report errors against the transform name.
#[derive(Debug, Clone, Copy)]
pub struct TransformParams<'a> {
    target: &'a str,
    values: &'a ConfigMap,
}

impl<'a> TransformParams<'a> {
    pub fn new(target: &'a str, values: &'a ConfigMap) -> Self {
        Self { target, values }
    }

    pub fn target(&self) -> &'a str {
        self.target
    }

    pub fn invalid(&self, parameter: &str, reason: impl Into<String>) -> TransformError {
        TransformError::InvalidParameter {
            transform: self.target.to_string(),
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> {
        self.values.keys().filter(|k| !k.starts_with('_'))
    }

    /// Rejects parameters the transform does not understand.
    pub fn expect_only(&self, allowed: &[&str]) -> Result<(), TransformError> {
        match self.keys().find(|k| !allowed.contains(k)) {
            Some(unknown) => Err(self.invalid(
                unknown,
                format!("unknown parameter; expected one of {}", allowed.join(", ")),
            )),
            None => Ok(()),
        }
    }

    pub fn value(&self, key: &str) -> Option<&'a ConfigValue> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64, TransformError> {
        match self.value(key) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .filter(|x| x.is_finite())
                .ok_or_else(|| self.invalid(key, format!("expected a finite number, found {}", v.type_name()))),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, TransformError> {
        match self.value(key) {
            None => Ok(default),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| self.invalid(key, format!("expected a boolean, found {}", v.type_name()))),
        }
    }

    pub fn str_or(&self, key: &str, default: &'a str) -> Result<&'a str, TransformError> {
        match self.value(key) {
            None => Ok(default),
            Some(v) => v
                .as_str()
                .ok_or_else(|| self.invalid(key, format!("expected a string, found {}", v.type_name()))),
        }
    }

    /// A number in `[0, 1]`.
    pub fn probability_or(&self, key: &str, default: f64) -> Result<f64, TransformError> {
        let p = self.f64_or(key, default)?;
        if (0.0..=1.0).contains(&p) {
            Ok(p)
        } else {
            Err(self.invalid(key, format!("{} is not within [0, 1]", p)))
        }
    }

    pub fn non_negative_or(&self, key: &str, default: f64) -> Result<f64, TransformError> {
        let x = self.f64_or(key, default)?;
        if x >= 0.0 {
            Ok(x)
        } else {
            Err(self.invalid(key, format!("{} is negative", x)))
        }
    }

    pub fn list(&self, key: &str) -> Result<&'a [ConfigValue], TransformError> {
        let v = self
            .value(key)
            .ok_or_else(|| self.invalid(key, "missing required list"))?;
        v.as_list()
            .ok_or_else(|| self.invalid(key, format!("expected a list, found {}", v.type_name())))
    }
}
