//! Agora Config
//!
//! Everything the runner needs to turn a JSON document into typed settings:
//!
//! - [`Settings`]: typed accessors over one JSON object, with key-aware errors
//! - [`json_extends`]: `extends` inheritance with cycle detection
//! - [`JsonRandom`] / [`Distribution`]: scalar or distribution-valued settings

mod error;
mod extends;
mod random;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use extends::{deep_merge, json_extends};
pub use random::{Distribution, JsonRandom};
pub use settings::Settings;
