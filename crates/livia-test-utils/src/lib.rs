// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for LIVIA integration tests.

pub mod harness;

pub use axum::http::{Method, StatusCode};
pub use harness::{SeededTenant, TestHarness, TestHarnessBuilder};
