//! LEG toolkit library.
//!
//! A registry of admin tools for a Swiss local energy community (LEG)
//! platform: registrations, communities, white-label tenants, public energy
//! data, the VNB sales pipeline, documents and billing. The same registry
//! backs the `invoke` CLI and the MCP server.

pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod mcp;
pub mod scoring;
pub mod sql;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{ToolkitError, ToolkitResult};
pub use mcp::LegService;
pub use tools::{Dispatcher, ToolRegistry};
