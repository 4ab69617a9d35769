// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::LiviaConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &LiviaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.realtime.channel_capacity == 0 {
        fail("realtime.channel_capacity must be greater than zero".to_string());
    }

    if config.realtime.queue_capacity == 0 {
        fail("realtime.queue_capacity must be greater than zero".to_string());
    }

    let threshold = config.inbox.scroll_threshold_px;
    if !threshold.is_finite() || threshold < 0.0 {
        fail(format!(
            "inbox.scroll_threshold_px must be a non-negative number, got {threshold}"
        ));
    }

    if config.workflow.timeout_secs == 0 {
        fail("workflow.timeout_secs must be greater than zero".to_string());
    }

    if let Some(url) = &config.workflow.webhook_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        fail(format!(
            "workflow.webhook_url `{url}` must use the http or https scheme"
        ));
    }

    if config.billing.max_retries > 10 {
        fail(format!(
            "billing.max_retries must be at most 10, got {}",
            config.billing.max_retries
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
