// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `livia doctor` command implementation.
//!
//! Opens the configured database, runs a health check and verifies that
//! every tenant's wallet balance matches its ledger.

use std::time::{Duration, Instant};

use livia_billing::WalletLedger;
use livia_config::model::LiviaConfig;
use livia_core::{HealthStatus, LiviaError, StorageAdapter};
use livia_storage::SqliteStorage;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: impl Into<String>, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `livia doctor` command.
///
/// The configuration was already validated by the time this runs, so the
/// first check only reports it. Fails when any check fails.
pub async fn run_doctor(config: &LiviaConfig) -> Result<(), LiviaError> {
    let results = collect_checks(config).await;

    println!();
    println!("  livia doctor");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;
    for result in &results {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => {
                warn_count += 1;
                "[WARN]"
            }
            CheckStatus::Fail => {
                fail_count += 1;
                "[FAIL]"
            }
        };
        println!(
            "    {tag} {:<20} {} ({}ms)",
            result.name,
            result.message,
            result.duration.as_millis()
        );
    }

    println!();
    println!(
        "  {} checks, {fail_count} failed, {warn_count} warnings",
        results.len()
    );

    if fail_count > 0 {
        return Err(LiviaError::Internal(format!(
            "{fail_count} doctor check(s) failed"
        )));
    }
    Ok(())
}

/// Runs every check in order. Checks that depend on the database are skipped
/// when it cannot be opened.
pub async fn collect_checks(config: &LiviaConfig) -> Vec<CheckResult> {
    let mut results = vec![CheckResult::new(
        "config",
        CheckStatus::Pass,
        "valid",
        Instant::now(),
    )];

    let start = Instant::now();
    let storage = SqliteStorage::new(config.storage.clone());
    if let Err(e) = storage.initialize().await {
        results.push(CheckResult::new(
            "database",
            CheckStatus::Fail,
            format!("cannot open {}: {e}", config.storage.database_path),
            start,
        ));
        return results;
    }
    results.push(check_health(&storage, start).await);
    results.extend(check_ledgers(&storage).await);

    if let Err(e) = storage.close().await {
        results.push(CheckResult::new(
            "checkpoint",
            CheckStatus::Warn,
            e.to_string(),
            Instant::now(),
        ));
    }
    results
}

async fn check_health(storage: &SqliteStorage, start: Instant) -> CheckResult {
    match storage.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new("database", CheckStatus::Pass, "healthy", start),
        Ok(HealthStatus::Degraded(reason)) => {
            CheckResult::new("database", CheckStatus::Warn, format!("degraded: {reason}"), start)
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            CheckResult::new("database", CheckStatus::Fail, format!("unhealthy: {reason}"), start)
        }
        Err(e) => CheckResult::new("database", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_ledgers(storage: &SqliteStorage) -> Vec<CheckResult> {
    let start = Instant::now();
    let ledger = match storage.database() {
        Ok(db) => WalletLedger::from_database(db),
        Err(e) => return vec![CheckResult::new("ledger", CheckStatus::Fail, e.to_string(), start)],
    };
    let tenants = match storage.list_tenant_ids().await {
        Ok(tenants) => tenants,
        Err(e) => return vec![CheckResult::new("ledger", CheckStatus::Fail, e.to_string(), start)],
    };
    if tenants.is_empty() {
        return vec![CheckResult::new("ledger", CheckStatus::Pass, "no tenants", start)];
    }

    let mut results = Vec::with_capacity(tenants.len());
    for tenant_id in tenants {
        let start = Instant::now();
        let name = format!("ledger {tenant_id}");
        let result = match ledger.verify_invariant(&tenant_id).await {
            Ok(check) if check.is_consistent() => CheckResult::new(
                name,
                CheckStatus::Pass,
                format!("balance {} over {} entries", check.folded, check.entries),
                start,
            ),
            Ok(check) => CheckResult::new(
                name,
                CheckStatus::Fail,
                format!("entries fold to {} but sum to {}", check.folded, check.summed),
                start,
            ),
            Err(e) => CheckResult::new(name, CheckStatus::Fail, e.to_string(), start),
        };
        results.push(result);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use livia_core::TenantId;

    fn config_for(path: &std::path::Path) -> LiviaConfig {
        let mut config = LiviaConfig::default();
        config.storage.database_path = path.to_string_lossy().to_string();
        config
    }

    #[tokio::test]
    async fn fresh_database_passes() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir.path().join("doctor.db"));

        let results = collect_checks(&config).await;
        assert!(results.iter().all(|r| r.status == CheckStatus::Pass), "{results:?}");
        assert!(results.iter().any(|r| r.message == "no tenants"));
    }

    #[tokio::test]
    async fn reports_one_ledger_check_per_tenant() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doctor.db");
        let config = config_for(&path);

        {
            let storage = SqliteStorage::new(config.storage.clone());
            storage.initialize().await.unwrap();
            for tenant in ["t1", "t2"] {
                storage
                    .create_tenant(&TenantId::from(tenant), tenant)
                    .await
                    .unwrap();
            }
            let ledger = WalletLedger::from_database(storage.database().unwrap());
            ledger
                .credit(&TenantId::from("t1"), 500, "recarga")
                .await
                .unwrap();
            storage.close().await.unwrap();
        }

        let results = collect_checks(&config).await;
        let ledgers: Vec<_> = results
            .iter()
            .filter(|r| r.name.starts_with("ledger "))
            .collect();
        assert_eq!(ledgers.len(), 2);
        assert!(ledgers.iter().all(|r| r.status == CheckStatus::Pass));
        assert!(ledgers.iter().any(|r| r.message == "balance 500 over 1 entries"));
    }

    #[tokio::test]
    async fn unopenable_database_fails_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        // A directory is not a database file.
        let config = config_for(dir.path());

        let results = collect_checks(&config).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].status, CheckStatus::Fail);
    }
}
