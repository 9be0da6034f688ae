use agora_config::{ConfigError, ConfigResult, Settings};
use agora_core::{Session, SessionId, Time};
use serde::Deserialize;
use serde_json::{Map, Value};

/// One entry of `simulation.sessions`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    pub session_name: String,
    pub iteration_steps: Time,
    pub with_order_placement: bool,
    pub with_order_execution: bool,
    pub with_print: bool,
    #[serde(default = "default_max_orders")]
    pub max_normal_orders: usize,
    #[serde(default = "default_max_orders")]
    pub max_high_frequency_orders: usize,
    #[serde(default = "default_submit_rate")]
    pub high_frequency_submit_rate: f64,
    /// Event type names created when this session is built
    #[serde(default)]
    pub events: Vec<String>,
}

fn default_max_orders() -> usize {
    1
}

fn default_submit_rate() -> f64 {
    1.0
}

/// Renamed keys still accepted with a warning
const LEGACY_KEYS: [(&str, &str); 2] = [
    ("highFrequencySubmitRate", "hifreqSubmitRate"),
    ("maxHighFrequencyOrders", "maxHifreqOrders"),
];

impl SessionSettings {
    pub fn from_value(value: &Value) -> ConfigResult<Self> {
        let settings = Settings::from_value(value.clone())?;
        let mut map: Map<String, Value> = settings.as_map().clone();
        for (key, legacy) in LEGACY_KEYS {
            if let Some(resolved) = settings.get_with_legacy(key, legacy)? {
                map.insert(key.to_string(), resolved.clone());
                map.remove(legacy);
            }
        }
        let parsed: Self = serde_json::from_value(Value::Object(map))?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.iteration_steps < 0 {
            return Err(ConfigError::InvalidValue {
                key: "iterationSteps".to_string(),
                reason: format!("must be non-negative, got {}", self.iteration_steps),
            });
        }
        if !(0.0..=1.0).contains(&self.high_frequency_submit_rate) {
            return Err(ConfigError::InvalidValue {
                key: "highFrequencySubmitRate".to_string(),
                reason: format!("must lie in [0, 1], got {}", self.high_frequency_submit_rate),
            });
        }
        Ok(())
    }

    pub fn into_session(self, session_id: SessionId, start_time: Time) -> Session {
        Session {
            session_id,
            name: self.session_name,
            start_time,
            iteration_steps: self.iteration_steps,
            with_order_placement: self.with_order_placement,
            with_order_execution: self.with_order_execution,
            with_print: self.with_print,
            max_normal_orders: self.max_normal_orders,
            max_high_frequency_orders: self.max_high_frequency_orders,
            high_frequency_submission_rate: self.high_frequency_submit_rate,
        }
    }
}
