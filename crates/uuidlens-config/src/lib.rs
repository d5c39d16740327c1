//! # uuidlens Config
//!
//! Configuration management for uuidlens: settings, scan tables, classifier
//! overrides, resolver limits and the remote authority connection.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
