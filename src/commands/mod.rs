//! Command implementations for the CLI
//!
//! - start: Start the server
//! - config: Configuration display and validation
//! - audit: Inspect stored audit records

pub mod audit;
pub mod config;
pub mod start;
