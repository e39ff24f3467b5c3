//! Configuration model for gbp-helper.
//!
//! This module defines the [`Config`] struct that represents `gbp-helper.conf`,
//! a newline-separated `key=value` file. Lines starting with `#` and lines
//! without `=` are ignored, unknown keys produce a warning, and empty values
//! mean "unset".

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use operations::{parse_key_values, render_example};
pub use types::{DEFAULT_CONFIG_PATH, SETTINGS, Setting};
