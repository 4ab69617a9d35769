// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wallet ledger and billing retry policy for LIVIA.

pub mod ledger;
pub mod retry;

pub use ledger::{LedgerCheck, WalletLedger, fold_balance};
pub use retry::RetryPolicy;
