// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Covers constraints serde cannot express: URL schemes, non-zero sizes and
//! intervals, and the ordering of the reconnect delay bounds.

use crate::diagnostic::ConfigError;
use crate::model::CourierConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every violation instead of failing on the first one.
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(invalid(format!(
            "agent.log_level `{}` must be one of {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if let Err(msg) = check_url(&config.backend.base_url, &["http", "https"]) {
        errors.push(invalid(format!("backend.base_url {msg}")));
    }

    if let Some(url) = &config.backend.realtime_url
        && let Err(msg) = check_url(url, &["ws", "wss"])
    {
        errors.push(invalid(format!("backend.realtime_url {msg}")));
    }

    if config.backend.request_timeout_secs == 0 {
        errors.push(invalid("backend.request_timeout_secs must be at least 1"));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(invalid("storage.database_path must not be empty"));
    }

    if config.queue.max_queue_size == 0 {
        errors.push(invalid("queue.max_queue_size must be at least 1"));
    }
    if config.queue.drain_interval_secs == 0 {
        errors.push(invalid("queue.drain_interval_secs must be at least 1"));
    }
    if config.queue.storage_key.trim().is_empty() {
        errors.push(invalid("queue.storage_key must not be empty"));
    }

    if config.realtime.base_delay_ms == 0 {
        errors.push(invalid("realtime.base_delay_ms must be at least 1"));
    }
    if config.realtime.max_delay_ms < config.realtime.base_delay_ms {
        errors.push(invalid(format!(
            "realtime.max_delay_ms ({}) must not be below realtime.base_delay_ms ({})",
            config.realtime.max_delay_ms, config.realtime.base_delay_ms
        )));
    }

    if config.telemetry.batch_size == 0 {
        errors.push(invalid("telemetry.batch_size must be at least 1"));
    }
    if config.telemetry.batch_interval_ms == 0 {
        errors.push(invalid("telemetry.batch_interval_ms must be at least 1"));
    }
    if config.telemetry.max_queue_size < config.telemetry.batch_size {
        errors.push(invalid(format!(
            "telemetry.max_queue_size ({}) must be at least telemetry.batch_size ({})",
            config.telemetry.max_queue_size, config.telemetry.batch_size
        )));
    }
    if config.telemetry.session_key.trim().is_empty() {
        errors.push(invalid("telemetry.session_key must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

/// Checks that `url` is `<scheme>://<host>...` with one of the allowed schemes.
fn check_url(url: &str, schemes: &[&str]) -> Result<(), String> {
    let Some((scheme, rest)) = url.split_once("://") else {
        return Err(format!("`{url}` is not an absolute URL"));
    };
    if !schemes.contains(&scheme) {
        return Err(format!(
            "`{url}` must use one of the schemes: {}",
            schemes.join(", ")
        ));
    }
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(format!("`{url}` has no valid host"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&CourierConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = CourierConfig::default();
        config.queue.max_queue_size = 0;
        config.telemetry.batch_size = 0;
        config.backend.base_url = "ftp://example.com".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "got: {errors:?}");
    }

    #[test]
    fn realtime_url_requires_ws_scheme() {
        let mut config = CourierConfig::default();
        config.backend.realtime_url = Some("http://example.com/ws".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("backend.realtime_url"));

        config.backend.realtime_url = Some("wss://example.com/ws".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn max_delay_below_base_delay_rejected() {
        let mut config = CourierConfig::default();
        config.realtime.base_delay_ms = 5000;
        config.realtime.max_delay_ms = 1000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn url_without_host_rejected() {
        assert!(check_url("http://", &["http"]).is_err());
        assert!(check_url("not a url", &["http"]).is_err());
        assert!(check_url("https://pos.example.com/api", &["http", "https"]).is_ok());
    }
}
