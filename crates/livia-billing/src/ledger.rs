// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant wallet ledger.
//!
//! The ledger is append-only (enforced by triggers in the schema) and amounts
//! are signed minor credit units. A tenant's balance is never stored: it is
//! the sum of the tenant's entries.

use chrono::{DateTime, Utc};
use livia_core::{LedgerEntry, LedgerKind, LiviaError, TenantId};
use livia_storage::{Database, enum_from_sql, map_tr_err, now_millis, ts_from_sql, ts_to_sql};
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{info, warn};

/// Sum of `entries`, saturating at the `i64` bounds.
pub fn fold_balance(entries: &[LedgerEntry]) -> i64 {
    entries
        .iter()
        .fold(0i64, |acc, entry| acc.saturating_add(entry.amount))
}

/// Result of [`WalletLedger::verify_invariant`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerCheck {
    pub tenant_id: TenantId,
    pub entries: usize,
    /// Balance folded over the entries in application code.
    pub folded: i64,
    /// Balance summed by SQLite.
    pub summed: i64,
}

impl LedgerCheck {
    pub fn is_consistent(&self) -> bool {
        self.folded == self.summed
    }
}

enum Append {
    Applied,
    Insufficient { balance: i64 },
}

fn balance_in(conn: &Connection, tenant_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM wallet_ledger WHERE tenant_id = ?1",
        params![tenant_id],
        |row| row.get(0),
    )
}

/// Persistent wallet ledger.
///
/// Shares the storage connection, so every append is serialized with the
/// rest of the writes.
pub struct WalletLedger {
    conn: tokio_rusqlite::Connection,
}

impl WalletLedger {
    pub fn new(conn: tokio_rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(db.connection().clone())
    }

    /// Adds `amount` credits. `amount` must be positive.
    pub async fn credit(
        &self,
        tenant_id: &TenantId,
        amount: i64,
        description: &str,
    ) -> Result<LedgerEntry, LiviaError> {
        if amount <= 0 {
            return Err(LiviaError::InvalidInput(format!(
                "credit amount must be positive, got {amount}"
            )));
        }
        self.append(tenant_id, amount, LedgerKind::Credit, description, now_millis())
            .await
    }

    /// Spends `amount` credits. Fails without writing when the balance is short.
    pub async fn debit(
        &self,
        tenant_id: &TenantId,
        amount: i64,
        description: &str,
    ) -> Result<LedgerEntry, LiviaError> {
        if amount <= 0 {
            return Err(LiviaError::InvalidInput(format!(
                "debit amount must be positive, got {amount}"
            )));
        }
        self.append(tenant_id, -amount, LedgerKind::Debit, description, now_millis())
            .await
    }

    /// Signed correction entry. Cannot take the balance below zero.
    pub async fn adjust(
        &self,
        tenant_id: &TenantId,
        amount: i64,
        description: &str,
    ) -> Result<LedgerEntry, LiviaError> {
        if amount == 0 {
            return Err(LiviaError::InvalidInput(
                "adjustment amount must not be zero".to_string(),
            ));
        }
        self.append(tenant_id, amount, LedgerKind::Adjustment, description, now_millis())
            .await
    }

    async fn append(
        &self,
        tenant_id: &TenantId,
        amount: i64,
        kind: LedgerKind,
        description: &str,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry, LiviaError> {
        let entry = LedgerEntry {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.clone(),
            amount,
            kind,
            description: description.to_string(),
            created_at: at,
        };

        let row = entry.clone();
        let outcome = self
            .conn
            .call(move |conn| {
                // Balance check and append commit together.
                let tx = conn.transaction()?;
                if row.amount < 0 {
                    let balance = balance_in(&tx, row.tenant_id.as_str())?;
                    if balance.saturating_add(row.amount) < 0 {
                        return Ok(Append::Insufficient { balance });
                    }
                }
                tx.execute(
                    "INSERT INTO wallet_ledger (id, tenant_id, amount, kind, description, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        row.id,
                        row.tenant_id.as_str(),
                        row.amount,
                        row.kind.to_string(),
                        row.description,
                        ts_to_sql(&row.created_at),
                    ],
                )?;
                tx.commit()?;
                Ok(Append::Applied)
            })
            .await
            .map_err(map_tr_err)?;

        match outcome {
            Append::Applied => {
                info!(
                    tenant_id = %entry.tenant_id,
                    amount = entry.amount,
                    kind = %entry.kind,
                    "ledger entry appended"
                );
                Ok(entry)
            }
            Append::Insufficient { balance } => {
                warn!(tenant_id = %tenant_id, balance, requested = -amount, "debit rejected");
                Err(LiviaError::InsufficientCredits {
                    balance,
                    requested: -amount,
                })
            }
        }
    }

    pub async fn balance(&self, tenant_id: &TenantId) -> Result<i64, LiviaError> {
        let tenant_id = tenant_id.clone();
        self.conn
            .call(move |conn| balance_in(conn, tenant_id.as_str()))
            .await
            .map_err(map_tr_err)
    }

    /// Entries of a tenant, oldest first.
    pub async fn entries(&self, tenant_id: &TenantId) -> Result<Vec<LedgerEntry>, LiviaError> {
        let tenant_id = tenant_id.clone();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, tenant_id, amount, kind, description, created_at
                     FROM wallet_ledger WHERE tenant_id = ?1
                     ORDER BY created_at ASC, rowid ASC",
                )?;
                let rows = stmt.query_map(params![tenant_id.as_str()], |row| {
                    Ok(LedgerEntry {
                        id: row.get(0)?,
                        tenant_id: TenantId::from(row.get::<_, String>(1)?),
                        amount: row.get(2)?,
                        kind: enum_from_sql(row, 3)?,
                        description: row.get(4)?,
                        created_at: ts_from_sql(row, 5)?,
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Compares the folded entries with the SQL sum.
    pub async fn verify_invariant(&self, tenant_id: &TenantId) -> Result<LedgerCheck, LiviaError> {
        let entries = self.entries(tenant_id).await?;
        let summed = self.balance(tenant_id).await?;
        let check = LedgerCheck {
            tenant_id: tenant_id.clone(),
            entries: entries.len(),
            folded: fold_balance(&entries),
            summed,
        };
        if !check.is_consistent() {
            warn!(
                tenant_id = %tenant_id,
                folded = check.folded,
                summed = check.summed,
                "wallet ledger invariant violated"
            );
        }
        Ok(check)
    }
}
