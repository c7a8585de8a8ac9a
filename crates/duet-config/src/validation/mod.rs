//! Full configuration validation.
//!
//! Validates numeric ranges and the listener address. Each section has its
//! own function; `validate` calls them all and collects errors into a
//! single `ConfigError`.

mod helpers;
mod sections;


use crate::schema::DuetConfig;
use duet_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &DuetConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    sections::validate_server(&mut errors, config);
    sections::validate_limits(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
