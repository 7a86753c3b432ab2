//! route_open tool implementation.
//!
//! Navigates the lazy route table and reports the resulting view.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use trailhead_client::PageModule;
use trailhead_core::{RouteTable, RouteView};

use super::json_result;

/// Parameters for the route_open tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RouteOpenParams {
    /// Site path to navigate to (e.g. "/about").
    pub path: String,

    /// Include the page HTML in the output (default: false).
    #[serde(default)]
    pub include_html: bool,
}

/// Output from the route_open tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RouteOpenOutput {
    pub path: String,
    /// "ready", "not-found" or "failed".
    pub view: String,
    pub title: Option<String>,
    /// "cache" or "network" when the page is ready.
    pub source: Option<String>,
    pub html: Option<String>,
    /// Load error shown by the error view.
    pub error: Option<String>,
    /// Loader invocations so far for this path.
    pub loads: usize,
}

/// Implementation of the route_open tool.
pub async fn route_open_impl(
    routes: &RouteTable<PageModule>, params: RouteOpenParams,
) -> Result<CallToolResult, McpError> {
    let view = routes.navigate(&params.path).await;

    let mut output = RouteOpenOutput {
        path: view.path().to_string(),
        view: view.kind().to_string(),
        title: None,
        source: None,
        html: None,
        error: None,
        loads: routes.load_count(&params.path),
    };

    match view {
        RouteView::Ready { module, .. } => {
            output.title = module.title.clone();
            output.source = serde_json::to_value(module.source).ok().and_then(|v| v.as_str().map(str::to_string));
            if params.include_html {
                output.html = Some(module.html.clone());
            }
        }
        RouteView::Failed { error, .. } => output.error = Some(error),
        RouteView::NotFound { .. } | RouteView::Placeholder { .. } => {}
    }

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{interceptor, output};
    use std::sync::Arc;
    use trailhead_client::page_routes;

    fn open(path: &str) -> RouteOpenParams {
        RouteOpenParams { path: path.to_string(), include_html: false }
    }

    #[tokio::test]
    async fn test_open_known_route() {
        let worker = interceptor().await;
        let routes = page_routes(Arc::clone(&worker), ["/", "/about"]);

        let params = RouteOpenParams { path: "/about".into(), include_html: true };
        let opened = output(route_open_impl(&routes, params).await.unwrap());
        assert_eq!(opened["view"], "ready");
        assert_eq!(opened["title"], "About");
        assert_eq!(opened["source"], "network");
        assert_eq!(opened["html"], "<h1>About</h1>");
        assert_eq!(opened["loads"], 1);

        let again = output(route_open_impl(&routes, open("/about")).await.unwrap());
        assert_eq!(again["loads"], 1);
        assert!(again["html"].is_null());
    }

    #[tokio::test]
    async fn test_open_unknown_route_is_not_found() {
        let routes = page_routes(interceptor().await, ["/"]);

        for path in ["/nope", "", "about", "/about/"] {
            let opened = output(route_open_impl(&routes, open(path)).await.unwrap());
            assert_eq!(opened["view"], "not-found");
            assert_eq!(opened["loads"], 0);
        }
    }

    #[tokio::test]
    async fn test_open_failing_route_shows_error_view() {
        let routes = page_routes(interceptor().await, ["/contact"]);

        let opened = output(route_open_impl(&routes, open("/contact")).await.unwrap());
        assert_eq!(opened["view"], "failed");
        assert!(opened["error"].as_str().unwrap().contains("404"));
    }
}
