// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the LIVIA configuration system.

use livia_config::diagnostic::ConfigError;
use livia_config::{load_and_validate_str, load_config_from_str};

#[test]
fn valid_toml_deserializes_into_livia_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 3000
log_level = "debug"

[storage]
database_path = "/tmp/livia-test.db"
wal_mode = false

[realtime]
channel_capacity = 64

[inbox]
scroll_threshold_px = 48.0

[workflow]
webhook_url = "https://flows.example.com/webhook/livia"
timeout_secs = 5

[billing]
max_retries = 2
initial_backoff_ms = 50
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/livia-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.realtime.channel_capacity, 64);
    assert_eq!(config.inbox.scroll_threshold_px, 48.0);
    assert_eq!(
        config.workflow.webhook_url.as_deref(),
        Some("https://flows.example.com/webhook/livia")
    );
    assert_eq!(config.workflow.timeout_secs, 5);
    assert_eq!(config.billing.max_retries, 2);
    assert_eq!(config.billing.initial_backoff_ms, 50);
}

#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.storage.database_path, "livia.db");
    assert!(config.storage.wal_mode);
    assert!(config.workflow.webhook_url.is_none());
    assert_eq!(config.workflow.timeout_secs, 10);
    assert_eq!(config.billing.max_retries, 3);
    assert_eq!(config.inbox.scroll_threshold_px, 100.0);
}

#[test]
fn unknown_key_is_rejected_with_suggestion() {
    let toml = r#"
[workflow]
webhok_url = "https://flows.example.com"
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown key must fail");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key, suggestion, ..
            } => Some((key.clone(), suggestion.clone())),
            _ => None,
        })
        .expect("should produce an UnknownKey diagnostic");
    assert_eq!(unknown.0, "webhok_url");
    assert_eq!(unknown.1.as_deref(), Some("webhook_url"));
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[server]
port = "eighty"
"#;
    let errors = load_and_validate_str(toml).expect_err("wrong type must fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. } | ConfigError::Other(_)))
    );
}

#[test]
fn semantic_validation_runs_after_parse() {
    let toml = r#"
[workflow]
timeout_secs = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("zero timeout must fail");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("timeout_secs"))
    ));
}
