//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    RouteOpenParams, WorkerFetchParams, activate_impl, cache_list_impl, fetch_impl, install_impl, route_open_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use trailhead_client::{CacheInterceptor, FetchClient, PageModule};
use trailhead_core::RouteTable;

/// The main MCP server handler for trailhead.
#[derive(Clone)]
pub struct TrailheadServer {
    interceptor: Arc<CacheInterceptor<FetchClient>>,
    routes: Arc<RouteTable<PageModule>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl TrailheadServer {
    /// Create a new server handler.
    pub fn new(interceptor: Arc<CacheInterceptor<FetchClient>>, routes: Arc<RouteTable<PageModule>>) -> Self {
        Self { interceptor, routes, tool_router: Self::tool_router() }
    }

    #[tool(description = "Dispatch the install event: pre-cache every allow-listed path into the current cache generation. All-or-nothing.")]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.interceptor).await
    }

    #[tool(description = "Dispatch the activate event: delete every cache generation except the current one.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.interceptor).await
    }

    /// Send one request through the interceptor.
    ///
    /// Allow-listed paths are served cache-first once the worker is activated.
    #[tool(description = "Send a request through the cache interceptor. Returns status, body, and whether the response came from cache or network.")]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.interceptor, params.0).await
    }

    #[tool(description = "Navigate to a site route. Loads the page module on first visit; unknown paths return the not-found view.")]
    async fn route_open(&self, params: Parameters<RouteOpenParams>) -> Result<CallToolResult, McpError> {
        route_open_impl(&self.routes, params.0).await
    }

    #[tool(description = "List stored cache generations and the entries of the current one.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        cache_list_impl(&self.interceptor).await
    }
}

impl ServerHandler for TrailheadServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "trailhead".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
