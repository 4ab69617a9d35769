// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wallet read endpoint.

use axum::{Extension, Json, extract::State};
use livia_billing::fold_balance;
use livia_core::{AuthenticatedUser, LedgerEntry};
use serde::Serialize;

use crate::error::ApiError;
use crate::server::GatewayState;

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub success: bool,
    /// Sum of `entries`, in minor credit units.
    pub balance: i64,
    pub entries: Vec<LedgerEntry>,
}

/// GET /api/wallet
///
/// The balance is folded from the same read as the entries, so both always
/// agree. Transient storage failures are retried with exponential backoff.
pub async fn get_wallet(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<WalletResponse>, ApiError> {
    let tenant_id = &user.tenant_id;
    let ledger = &state.ledger;

    let entries = state
        .retry
        .run("wallet.entries", || ledger.entries(tenant_id))
        .await?;

    Ok(Json(WalletResponse {
        success: true,
        balance: fold_balance(&entries),
        entries,
    }))
}
