//! Test utilities: in-memory collaborators for the ledger service.

pub mod mocks;

pub use mocks::{MockConfig, MockLedgerStore};
