//! MCP tool inputs for the WeCom admin server.
//!
//! This module contains the input types and conversions for the MCP
//! tools that expose WeCom directory and messaging operations.

mod inputs;

pub use inputs::*;
