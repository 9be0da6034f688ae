use rand::Rng;
use serde_json::{Map, Value};

use crate::{ConfigError, ConfigResult, JsonRandom};

/// One JSON settings object with typed, key-aware accessors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    map: Map<String, Value>,
}

impl From<Map<String, Value>> for Settings {
    fn from(map: Map<String, Value>) -> Self {
        Self { map }
    }
}

impl Settings {
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        match value {
            Value::Object(map) => Ok(Self { map }),
            _ => Err(ConfigError::InvalidType {
                key: "settings".to_string(),
                expected: "an object",
            }),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.map
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.map
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn required(&self, key: &str) -> ConfigResult<&Value> {
        self.map
            .get(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    pub fn optional_f64(&self, key: &str) -> ConfigResult<Option<f64>> {
        self.map
            .get(key)
            .map(|value| value.as_f64().ok_or_else(|| wrong_type(key, "a number")))
            .transpose()
    }

    pub fn required_f64(&self, key: &str) -> ConfigResult<f64> {
        self.optional_f64(key)?
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    /// Integers only; `1.5` and `"1"` are rejected
    pub fn optional_i64(&self, key: &str) -> ConfigResult<Option<i64>> {
        self.map
            .get(key)
            .map(|value| value.as_i64().ok_or_else(|| wrong_type(key, "an integer")))
            .transpose()
    }

    pub fn required_i64(&self, key: &str) -> ConfigResult<i64> {
        self.optional_i64(key)?
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    pub fn optional_bool(&self, key: &str) -> ConfigResult<Option<bool>> {
        self.map
            .get(key)
            .map(|value| value.as_bool().ok_or_else(|| wrong_type(key, "a boolean")))
            .transpose()
    }

    pub fn required_bool(&self, key: &str) -> ConfigResult<bool> {
        self.optional_bool(key)?
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    pub fn optional_str(&self, key: &str) -> ConfigResult<Option<&str>> {
        self.map
            .get(key)
            .map(|value| value.as_str().ok_or_else(|| wrong_type(key, "a string")))
            .transpose()
    }

    pub fn required_str(&self, key: &str) -> ConfigResult<&str> {
        self.optional_str(key)?
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    pub fn optional_str_list(&self, key: &str) -> ConfigResult<Option<Vec<String>>> {
        let Some(value) = self.map.get(key) else {
            return Ok(None);
        };
        let items = value
            .as_array()
            .ok_or_else(|| wrong_type(key, "a list of strings"))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| wrong_type(key, "a list of strings"))
            })
            .collect::<ConfigResult<Vec<_>>>()
            .map(Some)
    }

    pub fn str_list(&self, key: &str) -> ConfigResult<Vec<String>> {
        self.optional_str_list(key)?
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    /// Sample a scalar or distribution-valued setting
    pub fn random_f64<R: Rng + ?Sized>(&self, key: &str, rng: &mut R) -> ConfigResult<f64> {
        JsonRandom::new(rng).random(self.required(key)?)
    }

    pub fn optional_random_f64<R: Rng + ?Sized>(
        &self,
        key: &str,
        rng: &mut R,
    ) -> ConfigResult<Option<f64>> {
        self.map
            .get(key)
            .map(|value| JsonRandom::new(rng).random(value))
            .transpose()
    }

    /// Fail if a key whose semantics changed is still present
    pub fn reject_deprecated(&self, key: &str, replacement: &str) -> ConfigResult<()> {
        if self.map.contains_key(key) {
            return Err(ConfigError::Deprecated {
                key: key.to_string(),
                replacement: replacement.to_string(),
            });
        }
        Ok(())
    }

    /// Look up `key`, falling back to a renamed legacy key with a warning.
    /// Both present at once is an error.
    pub fn get_with_legacy(&self, key: &str, legacy: &str) -> ConfigResult<Option<&Value>> {
        match (self.map.get(key), self.map.get(legacy)) {
            (Some(_), Some(_)) => Err(ConfigError::Inconsistent(format!(
                "{legacy} and {key} cannot be used at the same time"
            ))),
            (Some(value), None) => Ok(Some(value)),
            (None, Some(value)) => {
                log::warn!("{legacy} is deprecated; use {key} instead");
                Ok(Some(value))
            }
            (None, None) => Ok(None),
        }
    }
}

fn wrong_type(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidType {
        key: key.to_string(),
        expected,
    }
}
