//! # launchdeck config
//!
//! Configuration for the launchdeck control plane: server binding, task
//! catalog location, LaunchAgent discovery and the manual-run interpreter.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
