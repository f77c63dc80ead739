//! Shared helpers for the integration suite.

pub mod mock_server;

pub use mock_server::*;
