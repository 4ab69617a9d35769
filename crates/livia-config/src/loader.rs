// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./livia.toml` > `~/.config/livia/livia.toml` > `/etc/livia/livia.toml`
//! with environment variable overrides via the `LIVIA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::LiviaConfig;

/// Sections whose env vars map `LIVIA_<SECTION>_<KEY>` to `<section>.<key>`.
const SECTIONS: &[&str] = &["server", "storage", "realtime", "inbox", "workflow", "billing"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/livia/livia.toml`
/// 3. `~/.config/livia/livia.toml`
/// 4. `./livia.toml`
/// 5. `LIVIA_*` environment variables
pub fn load_config() -> Result<LiviaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env vars).
pub fn load_config_from_str(toml_content: &str) -> Result<LiviaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LiviaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LiviaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LiviaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LiviaConfig::default()))
        .merge(Toml::file("/etc/livia/livia.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("livia/livia.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("livia.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// keys survive: `LIVIA_WORKFLOW_WEBHOOK_URL` maps to `workflow.webhook_url`,
/// not `workflow.webhook.url`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("LIVIA_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(*section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("workflow_webhook_url"), "workflow.webhook_url");
        assert_eq!(map_env_key("server_log_level"), "server.log_level");
        assert_eq!(map_env_key("billing_max_retries"), "billing.max_retries");
        assert_eq!(map_env_key("unknown"), "unknown");
    }

    #[test]
    fn env_override_applies() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LIVIA_SERVER_PORT", "9090");
            jail.set_env("LIVIA_WORKFLOW_WEBHOOK_URL", "https://flows.example.com/hook");
            let config: LiviaConfig = Figment::new()
                .merge(Serialized::defaults(LiviaConfig::default()))
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.server.port, 9090);
            assert_eq!(
                config.workflow.webhook_url.as_deref(),
                Some("https://flows.example.com/hook")
            );
            Ok(())
        });
    }
}
