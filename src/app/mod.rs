//! Application layer containing business logic and shared state.

pub mod oracle;
pub mod service;
pub mod state;

pub use oracle::CurrentBalanceOracle;
pub use service::AppService;
pub use state::AppState;
