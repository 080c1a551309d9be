//! Pricing MCP Server
//!
//! An MCP (Model Context Protocol) surface over the local pricing query engine.
//! Every tool is a thin adapter over `PricingService`:
//! - Sealed traits for controlled tool registration
//! - Typed argument structs; shape errors become `-32602`
//! - Engine failures become `-32000` with structured `data`

mod error;
mod mcp;
mod tools;

pub use error::{Error, Result, codes};
pub use mcp::{McpError, McpHandler, McpRequest, McpResponse};
pub use tools::Tool;
