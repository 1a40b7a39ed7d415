//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".to_string());
    }
    if config.server.public_dir.trim().is_empty() {
        errors.push("server.public_dir must not be empty".to_string());
    }

    if config.upstream.api_base.trim().is_empty() {
        errors.push("upstream.api_base must not be empty".to_string());
    }
    if config.upstream.model.trim().is_empty() {
        errors.push("upstream.model must not be empty".to_string());
    }
    if !(0.0..=2.0).contains(&config.upstream.temperature) {
        errors.push("upstream.temperature must be in [0.0, 2.0]".to_string());
    }

    if config.store.path.trim().is_empty() {
        errors.push("store.path must not be empty".to_string());
    }

    match config.logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        other => errors.push(format!("logging.level is not a valid level: {}", other)),
    }
    match config.logging.format.as_str() {
        "text" | "json" => {}
        other => errors.push(format!("logging.format must be text or json, got: {}", other)),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
