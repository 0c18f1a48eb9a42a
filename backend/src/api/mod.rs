//! API handlers.

pub mod headers;
pub mod mcp;
