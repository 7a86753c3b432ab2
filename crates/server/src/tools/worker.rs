//! worker_install, worker_activate and worker_fetch tool implementations.
//!
//! These play the host runtime: each call dispatches one lifecycle event.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use trailhead_client::fetch::resolve;
use trailhead_client::{
    CacheInterceptor, EventOutcome, FetchRequest, Method, Network, ResponseSource, WorkerEvent, WorkerState,
};
use trailhead_core::Error;

use super::json_result;

/// Output from the worker_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallOutput {
    /// Cache generation that was populated.
    pub cache_name: String,
    /// Number of entries stored.
    pub cached: usize,
    /// Worker state after the event.
    pub state: String,
}

/// Output from the worker_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerActivateOutput {
    pub cache_name: String,
    /// Stale generations that were deleted.
    pub deleted: Vec<String>,
    pub state: String,
}

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Path on the site origin (e.g. "/about") or an absolute http(s) URL.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are served from cache.
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    pub url: String,
    pub status: u16,
    /// "cache" or "network".
    pub source: String,
    pub content_type: Option<String>,
    /// Response body, lossily decoded as UTF-8.
    pub body: String,
    pub bytes: usize,
}

/// Implementation of the worker_install tool.
pub async fn install_impl<N: Network + 'static>(
    interceptor: &CacheInterceptor<N>,
) -> Result<CallToolResult, McpError> {
    let EventOutcome::Installed { cache_name, cached } = interceptor.dispatch(WorkerEvent::Install).await? else {
        return Err(Error::InvalidState("install produced an unexpected outcome".into()).into());
    };

    let output = WorkerInstallOutput { cache_name, cached, state: interceptor.state().await.to_string() };
    json_result(&output)
}

/// Implementation of the worker_activate tool.
pub async fn activate_impl<N: Network + 'static>(
    interceptor: &CacheInterceptor<N>,
) -> Result<CallToolResult, McpError> {
    let EventOutcome::Activated { cache_name, deleted } = interceptor.dispatch(WorkerEvent::Activate).await? else {
        return Err(Error::InvalidState("activate produced an unexpected outcome".into()).into());
    };

    let output = WorkerActivateOutput { cache_name, deleted, state: WorkerState::Activated.to_string() };
    json_result(&output)
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl<N: Network + 'static>(
    interceptor: &CacheInterceptor<N>, params: WorkerFetchParams,
) -> Result<CallToolResult, McpError> {
    let url = resolve(&interceptor.config().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let method = match params.method.as_deref() {
        None => Method::GET,
        Some(m) => Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("unsupported method: {m}")))?,
    };

    let EventOutcome::Responded(served) =
        interceptor.dispatch(WorkerEvent::Fetch(FetchRequest::new(method, url.clone()))).await?
    else {
        return Err(Error::InvalidState("fetch produced an unexpected outcome".into()).into());
    };

    let source = match served.source {
        ResponseSource::Cache => "cache",
        ResponseSource::Network => "network",
    };

    let output = WorkerFetchOutput {
        url: url.to_string(),
        status: served.response.status.as_u16(),
        source: source.to_string(),
        content_type: served.response.content_type().map(str::to_string),
        body: String::from_utf8_lossy(&served.response.bytes).into_owned(),
        bytes: served.response.bytes.len(),
    };

    json_result(&output)
}
