//! MCP tool implementations.
//!
//! This module contains all tools exposed by the trailhead server. Each
//! `*_impl` function is generic over the network so tests can run offline.

pub mod cache;
pub mod routes;
pub mod worker;

pub use cache::cache_list_impl;
pub use routes::{RouteOpenParams, route_open_impl};
pub use worker::{WorkerFetchParams, activate_impl, fetch_impl, install_impl};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use trailhead_core::Error;

/// Serialize a tool output as pretty-printed JSON text.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json =
        serde_json::to_string_pretty(output).map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
