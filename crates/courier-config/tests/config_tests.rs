// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Courier configuration system.

use courier_config::diagnostic::ConfigError;
use courier_config::model::CourierConfig;
use courier_config::{load_and_validate_str, load_config, load_config_from_str};

/// Valid TOML with every section deserializes successfully.
#[test]
fn valid_toml_deserializes_into_courier_config() {
    let toml = r#"
[agent]
log_level = "debug"
client_id = "till-3"
tenant_id = "bistro-42"

[backend]
base_url = "https://pos.example.com/api"
realtime_url = "wss://pos.example.com/ws"
auth_token = "secret"
request_timeout_secs = 10

[storage]
database_path = "/tmp/courier-test.db"

[queue]
max_queue_size = 50
drain_interval_secs = 15
storage_key = "orders"

[realtime]
enabled = false
max_reconnect_attempts = 8
base_delay_ms = 500
max_delay_ms = 10000
ping_interval_secs = 0

[telemetry]
enabled = true
batch_size = 20
batch_interval_ms = 2000
max_queue_size = 200
session_key = "sid"

[connectivity]
probe_interval_secs = 5
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.agent.client_id.as_deref(), Some("till-3"));
    assert_eq!(config.agent.tenant_id.as_deref(), Some("bistro-42"));
    assert_eq!(config.backend.base_url, "https://pos.example.com/api");
    assert_eq!(
        config.backend.realtime_url.as_deref(),
        Some("wss://pos.example.com/ws")
    );
    assert_eq!(config.backend.auth_token.as_deref(), Some("secret"));
    assert_eq!(config.backend.request_timeout_secs, 10);
    assert_eq!(config.storage.database_path, "/tmp/courier-test.db");
    assert_eq!(config.queue.max_queue_size, 50);
    assert_eq!(config.queue.drain_interval_secs, 15);
    assert_eq!(config.queue.storage_key, "orders");
    assert!(!config.realtime.enabled);
    assert_eq!(config.realtime.max_reconnect_attempts, 8);
    assert_eq!(config.realtime.base_delay_ms, 500);
    assert_eq!(config.realtime.max_delay_ms, 10000);
    assert_eq!(config.realtime.ping_interval_secs, 0);
    assert_eq!(config.telemetry.batch_size, 20);
    assert_eq!(config.telemetry.batch_interval_ms, 2000);
    assert_eq!(config.telemetry.max_queue_size, 200);
    assert_eq!(config.telemetry.session_key, "sid");
    assert_eq!(config.connectivity.probe_interval_secs, 5);
}

/// Empty TOML yields the compiled defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.agent.log_level, "info");
    assert!(config.agent.client_id.is_none());
    assert_eq!(config.backend.base_url, "http://127.0.0.1:8080/api");
    assert!(config.backend.realtime_url.is_none());
    assert!(config.backend.auth_token.is_none());
    assert_eq!(config.queue.max_queue_size, 100);
    assert_eq!(config.queue.drain_interval_secs, 30);
    assert_eq!(config.queue.storage_key, "courier.offline_orders");
    assert!(config.realtime.enabled);
    assert_eq!(config.realtime.max_reconnect_attempts, 5);
    assert_eq!(config.realtime.base_delay_ms, 1000);
    assert_eq!(config.telemetry.batch_size, 10);
    assert_eq!(config.telemetry.batch_interval_ms, 5000);
    assert_eq!(config.telemetry.max_queue_size, 100);
    assert_eq!(config.connectivity.probe_interval_secs, 0);
    assert_eq!(config, CourierConfig::default());
}

/// A misspelled key is rejected and the diagnostic suggests the right one.
#[test]
fn unknown_key_produces_suggestion() {
    let toml = r#"
[telemetry]
bacth_size = 5
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            span,
            ..
        } => {
            assert_eq!(key, "bacth_size");
            assert_eq!(suggestion.as_deref(), Some("batch_size"));
            assert!(span.is_some(), "inline source should be located");
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// Wrong value types are reported with the offending key path.
#[test]
fn invalid_type_reports_key_path() {
    let toml = r#"
[queue]
max_queue_size = "lots"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject string for usize");
    assert!(
        matches!(&errors[0], ConfigError::InvalidType { key, .. } if key == "queue.max_queue_size"),
        "got: {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_errors_surface_through_load_and_validate() {
    let toml = r#"
[realtime]
base_delay_ms = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero base delay is invalid");
    assert!(errors
        .iter()
        .any(|e| e.to_string().contains("realtime.base_delay_ms")));
}

/// Local `courier.toml` and `COURIER_*` env vars layer over the defaults.
#[test]
fn env_vars_override_local_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "courier.toml",
            r#"
[queue]
max_queue_size = 25

[backend]
base_url = "https://from-file.example.com"
"#,
        )?;
        jail.set_env("COURIER_QUEUE_MAX_QUEUE_SIZE", 7);
        jail.set_env("COURIER_BACKEND_AUTH_TOKEN", "env-token");

        let config = load_config()?;
        assert_eq!(config.queue.max_queue_size, 7);
        assert_eq!(config.backend.base_url, "https://from-file.example.com");
        assert_eq!(config.backend.auth_token.as_deref(), Some("env-token"));
        Ok(())
    });
}

/// Missing config files are skipped silently.
#[test]
fn missing_config_files_are_skipped() {
    figment::Jail::expect_with(|_jail| {
        let config = courier_config::load_config_from_path(std::path::Path::new(
            "/nonexistent/courier.toml",
        ))?;
        assert_eq!(config.queue.max_queue_size, 100);
        Ok(())
    });
}
