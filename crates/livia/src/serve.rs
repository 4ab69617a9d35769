// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `livia serve` command implementation.
//!
//! Opens SQLite storage, wires the change bus, wallet ledger and workflow
//! client into the gateway, and serves HTTP until SIGINT/SIGTERM.

use std::sync::Arc;

use livia_billing::{RetryPolicy, WalletLedger};
use livia_config::model::LiviaConfig;
use livia_core::{LiviaError, StorageAdapter};
use livia_gateway::{GatewayState, ServerConfig, WorkflowClient, start_server};
use livia_realtime::ChangeBus;
use livia_storage::SqliteStorage;
use tracing::{info, warn};

use crate::shutdown;

/// Runs the `livia serve` command.
pub async fn run_serve(config: LiviaConfig) -> Result<(), LiviaError> {
    init_tracing(&config.server.log_level);

    info!("starting livia serve");

    let bus = ChangeBus::new(config.realtime.channel_capacity);

    let storage = {
        let storage = SqliteStorage::new(config.storage.clone()).with_bus(bus.clone());
        storage.initialize().await?;
        Arc::new(storage)
    };
    info!(path = %config.storage.database_path, "storage initialized");

    let ledger = Arc::new(WalletLedger::from_database(storage.database()?));

    let workflow = Arc::new(WorkflowClient::from_config(&config.workflow)?);
    if workflow.is_enabled() {
        info!("workflow webhook enabled");
    } else {
        warn!("workflow.webhook_url not set, outbound messages and automations will not be relayed");
    }

    let state = GatewayState {
        storage: Arc::clone(&storage),
        bus,
        ledger,
        workflow,
        retry: RetryPolicy::from_config(&config.billing),
        start_time: std::time::Instant::now(),
    };

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    let cancel = shutdown::install_signal_handler();
    let served = start_server(&server_config, state, cancel).await;

    // Checkpoint even when the server failed so the WAL does not grow
    // across restarts.
    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage close failed");
    }

    served?;
    info!("livia serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("livia={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
