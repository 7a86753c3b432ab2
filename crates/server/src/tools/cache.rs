//! cache_list tool implementation.
//!
//! Reports stored generations and the entries of the current one.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use trailhead_client::{CacheInterceptor, Network};
use trailhead_core::cache::Generation;

use super::json_result;

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Name of the current generation.
    pub current: String,
    /// Worker state.
    pub state: String,
    /// Every stored generation, oldest first.
    pub generations: Vec<Generation>,
    /// "METHOD url" for each entry in the current generation.
    pub entries: Vec<String>,
}

/// Implementation of the cache_list tool.
pub async fn cache_list_impl<N: Network + 'static>(
    interceptor: &CacheInterceptor<N>,
) -> Result<CallToolResult, McpError> {
    let current = interceptor.config().cache_name.clone();
    let db = interceptor.db();

    let generations = db.list_generations().await?;
    let entries = db
        .entry_requests(&current)
        .await?
        .into_iter()
        .map(|r| format!("{} {}", r.method, r.url))
        .collect();

    let output = CacheListOutput { current, state: interceptor.state().await.to_string(), generations, entries };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{interceptor, output};

    #[tokio::test]
    async fn test_list_empty_cache() {
        let worker = interceptor().await;
        let listed = output(cache_list_impl(&worker).await.unwrap());

        assert_eq!(listed["current"], "trailhead-cache-v1");
        assert_eq!(listed["state"], "parsed");
        assert_eq!(listed["generations"].as_array().unwrap().len(), 0);
        assert_eq!(listed["entries"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_list_after_install() {
        let worker = interceptor().await;
        worker.install().await.unwrap();

        let listed = output(cache_list_impl(&worker).await.unwrap());
        let generations = listed["generations"].as_array().unwrap();
        assert_eq!(generations.len(), 1);
        assert_eq!(generations[0]["name"], "trailhead-cache-v1");
        assert_eq!(generations[0]["entry_count"], 2);
        assert_eq!(listed["entries"][0], "GET http://localhost:3000/");
        assert_eq!(listed["entries"][1], "GET http://localhost:3000/about");
    }
}
