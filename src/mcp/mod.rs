//! MCP server integration.
//!
//! Bridges the rmcp protocol handler to the shared tool dispatcher.

pub mod service;

pub use service::LegService;
