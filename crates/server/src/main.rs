//! trailhead server entry point.
//!
//! Boots the cache interceptor and route table, runs the worker registration
//! check, then serves MCP on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use trailhead_client::{
    CacheInterceptor, FetchClient, FetchConfig, InterceptorConfig, Network, RegistrationDecision, WorkerState,
    check_registration, page_routes,
};
use trailhead_core::{AppConfig, CacheDb, site};

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, cache = %config.cache_name(), "Starting trailhead server on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let interceptor_config = InterceptorConfig::from_app_config(&config)?;
    let interceptor = Arc::new(CacheInterceptor::with_shared_network(interceptor_config, Arc::clone(&network), db));

    register(&interceptor, &config).await;

    let routes = Arc::new(page_routes(Arc::clone(&interceptor), site::route_paths()));
    tracing::info!(routes = routes.len(), "route table ready");
    let handler = handler::TrailheadServer::new(interceptor, routes);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

/// Run the registration check and bring the worker up accordingly.
async fn register(interceptor: &CacheInterceptor<FetchClient>, config: &AppConfig) {
    let origin = &interceptor.config().origin;
    let decision = check_registration(interceptor.network(), origin, &config.worker_script).await;
    tracing::info!(?decision, "registration check");
    start_worker(interceptor, decision).await;
}

/// Lifecycle failures are logged; the tools can retry them.
async fn start_worker<N: Network + 'static>(interceptor: &CacheInterceptor<N>, decision: RegistrationDecision) {
    match decision {
        RegistrationDecision::Unregister => {
            tracing::info!("worker not registered; requests go straight to the network");
        }
        RegistrationDecision::Offline => match interceptor.resume().await {
            Ok(true) => {}
            Ok(false) => tracing::warn!("offline with no stored generation; nothing to serve from cache"),
            Err(e) => tracing::warn!(error = %e, "could not resume stored generation"),
        },
        RegistrationDecision::Register => {
            match interceptor.resume().await {
                Ok(true) => return,
                Ok(false) => {}
                Err(e) => tracing::warn!(error = %e, "could not resume stored generation"),
            }
            if interceptor.state().await == WorkerState::Parsed {
                if let Err(e) = interceptor.install().await {
                    tracing::warn!(error = %e, "startup install failed");
                    return;
                }
            }
            if let Err(e) = interceptor.activate().await {
                tracing::warn!(error = %e, "startup activate failed");
            }
        }
    }
}
