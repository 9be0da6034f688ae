use rand::Rng;
use rand_distr::StandardNormal;
use serde_json::Value;

use crate::{ConfigError, ConfigResult};

/// A scalar or distribution-valued setting
///
/// Accepted JSON shapes:
/// - `100.0`: constant
/// - `[a, b]`: uniform on `[a, b)`
/// - `{"const": [v]}`, `{"uniform": [a, b]}`, `{"normal": [mu, sigma]}`,
///   `{"expon": [lambda]}`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    Const(f64),
    Uniform { low: f64, high: f64 },
    Normal { mu: f64, sigma: f64 },
    /// Draws `lambda * -ln(U)`
    Exponential { lambda: f64 },
}

impl Distribution {
    pub fn from_json(value: &Value) -> ConfigResult<Self> {
        match value {
            Value::Number(_) => Ok(Distribution::Const(number(value, value)?)),
            Value::Array(args) => {
                let [low, high] = args.as_slice() else {
                    return Err(invalid("uniform distribution must be [min, max]", value));
                };
                Ok(Distribution::Uniform {
                    low: number(low, value)?,
                    high: number(high, value)?,
                })
            }
            Value::Object(spec) => {
                if spec.len() != 1 {
                    return Err(invalid("multiple specification of distribution type", value));
                }
                let Some((kind, args)) = spec.iter().next() else {
                    return Err(invalid("empty distribution spec", value));
                };
                let args = args
                    .as_array()
                    .ok_or_else(|| invalid("distribution arguments must be a list", value))?;
                match (kind.as_str(), args.as_slice()) {
                    ("const", [v]) => Ok(Distribution::Const(number(v, value)?)),
                    ("uniform", [low, high]) => Ok(Distribution::Uniform {
                        low: number(low, value)?,
                        high: number(high, value)?,
                    }),
                    ("normal", [mu, sigma]) => Ok(Distribution::Normal {
                        mu: number(mu, value)?,
                        sigma: number(sigma, value)?,
                    }),
                    ("expon", [lambda]) => Ok(Distribution::Exponential {
                        lambda: number(lambda, value)?,
                    }),
                    ("const" | "uniform" | "normal" | "expon", _) => {
                        Err(invalid("wrong number of distribution arguments", value))
                    }
                    _ => Err(invalid("unknown distribution type", value)),
                }
            }
            _ => Err(invalid("expected a number, a list or an object", value)),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Distribution::Const(value) => value,
            Distribution::Uniform { low, high } => rng.r#gen::<f64>() * (high - low) + low,
            Distribution::Normal { mu, sigma } => {
                let z: f64 = rng.sample(StandardNormal);
                mu + sigma * z
            }
            Distribution::Exponential { lambda } => {
                // 1 - U lies in (0, 1], so the log stays finite
                let u = 1.0 - rng.r#gen::<f64>();
                lambda * -u.ln()
            }
        }
    }
}

/// Samples distribution-valued settings with a caller-owned PRNG
pub struct JsonRandom<'a, R: Rng + ?Sized> {
    rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> JsonRandom<'a, R> {
    pub fn new(rng: &'a mut R) -> Self {
        Self { rng }
    }

    pub fn random(&mut self, value: &Value) -> ConfigResult<f64> {
        Ok(Distribution::from_json(value)?.sample(self.rng))
    }
}

fn number(value: &Value, whole: &Value) -> ConfigResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| invalid("distribution arguments must be numbers", whole))
}

fn invalid(reason: &str, value: &Value) -> ConfigError {
    ConfigError::InvalidDistribution(format!("{reason}: {value}"))
}
