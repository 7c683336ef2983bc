//! LP token ledger service.
//!
//! Reconstructs time-bucketed LP token balance histories by replaying the
//! append-only mint/burn ledger, and cross-checks them against the live
//! holdings view.

pub mod api;
pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
