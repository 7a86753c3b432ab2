//! Lazy route table.
//!
//! Maps each fixed path to a deferred module reference. A module is resolved
//! on the first navigation to its path and memoized afterwards; until then
//! the path renders a placeholder. Unknown paths render the not-found view,
//! and a failed resolution renders an error view that the next navigation retries.
//!
//! Every entry has its own load gate, so a slow load for one path never
//! blocks navigation to another.

mod state;

use state::LoadState;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, RwLock};

use crate::Error;

/// Future returned by a deferred module reference.
pub type ModuleFuture<M> = Pin<Box<dyn Future<Output = Result<M, Error>> + Send + 'static>>;

/// A deferred module reference: called once per load attempt.
pub type ModuleLoader<M> = Arc<dyn Fn() -> ModuleFuture<M> + Send + Sync>;

/// What a path shows at a point in time.
#[derive(Debug)]
pub enum RouteView<M> {
    /// The module is not resolved yet.
    Placeholder { path: String },
    /// The resolved module.
    Ready { path: String, module: Arc<M> },
    /// No route matches the path.
    NotFound { path: String },
    /// The last resolution failed.
    Failed { path: String, error: String },
}

impl<M> RouteView<M> {
    pub fn path(&self) -> &str {
        match self {
            RouteView::Placeholder { path }
            | RouteView::Ready { path, .. }
            | RouteView::NotFound { path }
            | RouteView::Failed { path, .. } => path,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RouteView::Placeholder { .. } => "placeholder",
            RouteView::Ready { .. } => "ready",
            RouteView::NotFound { .. } => "not-found",
            RouteView::Failed { .. } => "failed",
        }
    }

    pub fn module(&self) -> Option<&Arc<M>> {
        match self {
            RouteView::Ready { module, .. } => Some(module),
            _ => None,
        }
    }
}

struct RouteEntry<M> {
    loader: ModuleLoader<M>,
    state: RwLock<LoadState<M>>,
    gate: Mutex<()>,
    loads: AtomicUsize,
}

/// Static path-to-module table, built once at startup.
pub struct RouteTable<M> {
    entries: HashMap<String, RouteEntry<M>>,
}

/// Builder for [`RouteTable`].
pub struct RouteTableBuilder<M> {
    routes: Vec<(String, ModuleLoader<M>)>,
}

impl<M> Default for RouteTableBuilder<M> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<M: Send + Sync + 'static> RouteTableBuilder<M> {
    /// Register a path with its deferred module loader.
    ///
    /// Registering the same path twice keeps the later loader.
    pub fn route<F, Fut>(mut self, path: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M, Error>> + Send + 'static,
    {
        let loader: ModuleLoader<M> = Arc::new(move || Box::pin(loader()) as ModuleFuture<M>);
        self.routes.push((path.into(), loader));
        self
    }

    pub fn build(self) -> RouteTable<M> {
        let mut entries = HashMap::with_capacity(self.routes.len());
        for (path, loader) in self.routes {
            let entry =
                RouteEntry { loader, state: RwLock::new(LoadState::NotStarted), gate: Mutex::new(()), loads: AtomicUsize::new(0) };
            if entries.insert(path.clone(), entry).is_some() {
                tracing::warn!(path = %path, "duplicate route registration; keeping the later loader");
            }
        }
        RouteTable { entries }
    }
}

impl<M: Send + Sync + 'static> RouteTable<M> {
    pub fn builder() -> RouteTableBuilder<M> {
        RouteTableBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many times the path's loader has been invoked.
    pub fn load_count(&self, path: &str) -> usize {
        self.entries.get(path).map_or(0, |e| e.loads.load(Ordering::SeqCst))
    }

    /// What the path shows right now, without starting or awaiting a load.
    pub async fn render(&self, path: &str) -> RouteView<M> {
        let Some(entry) = self.entries.get(path) else {
            return RouteView::NotFound { path: path.to_string() };
        };

        match &*entry.state.read().await {
            LoadState::Ready(module) => RouteView::Ready { path: path.to_string(), module: Arc::clone(module) },
            LoadState::Failed(error) => RouteView::Failed { path: path.to_string(), error: error.clone() },
            LoadState::NotStarted | LoadState::Loading => RouteView::Placeholder { path: path.to_string() },
        }
    }

    /// Navigate to a path, resolving its module on first visit.
    ///
    /// Concurrent navigations to the same path share a single load. A failed
    /// load yields [`RouteView::Failed`] and is retried by the next navigation.
    pub async fn navigate(&self, path: &str) -> RouteView<M> {
        let Some(entry) = self.entries.get(path) else {
            tracing::debug!(path = %path, "no route; rendering not-found view");
            return RouteView::NotFound { path: path.to_string() };
        };

        if let LoadState::Ready(module) = &*entry.state.read().await {
            return RouteView::Ready { path: path.to_string(), module: Arc::clone(module) };
        }

        let _gate = entry.gate.lock().await;

        // another navigation may have finished the load while we waited
        if let LoadState::Ready(module) = &*entry.state.read().await {
            return RouteView::Ready { path: path.to_string(), module: Arc::clone(module) };
        }

        *entry.state.write().await = LoadState::Loading;
        entry.loads.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(path = %path, "resolving route module");

        match (entry.loader)().await {
            Ok(module) => {
                let module = Arc::new(module);
                *entry.state.write().await = LoadState::Ready(Arc::clone(&module));
                tracing::info!(path = %path, "route module ready");
                RouteView::Ready { path: path.to_string(), module }
            }
            Err(e) => {
                let error = e.to_string();
                tracing::warn!(path = %path, error = %error, "route module failed to load");
                *entry.state.write().await = LoadState::Failed(error.clone());
                RouteView::Failed { path: path.to_string(), error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    struct Page(&'static str);

    fn table() -> RouteTable<Page> {
        RouteTable::builder()
            .route("/", || async { Ok(Page("home")) })
            .route("/about", || async { Ok(Page("about")) })
            .build()
    }

    #[tokio::test]
    async fn test_navigate_resolves_module() {
        let routes = table();
        let view = routes.navigate("/about").await;
        assert_eq!(view.kind(), "ready");
        assert_eq!(view.module().unwrap().0, "about");
    }

    #[tokio::test]
    async fn test_render_before_navigation_is_placeholder() {
        let routes = table();
        assert!(matches!(routes.render("/about").await, RouteView::Placeholder { .. }));
        assert_eq!(routes.load_count("/about"), 0);

        routes.navigate("/about").await;
        assert!(matches!(routes.render("/about").await, RouteView::Ready { .. }));
    }

    #[tokio::test]
    async fn test_module_is_memoized() {
        let routes = table();
        let first = routes.navigate("/").await;
        let second = routes.navigate("/").await;

        assert_eq!(routes.load_count("/"), 1);
        assert!(Arc::ptr_eq(first.module().unwrap(), second.module().unwrap()));
    }

    #[tokio::test]
    async fn test_concurrent_navigations_share_one_load() {
        let routes = Arc::new(
            RouteTable::builder()
                .route("/slow", || async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(Page("slow"))
                })
                .build(),
        );

        let a = tokio::spawn({
            let routes = Arc::clone(&routes);
            async move { routes.navigate("/slow").await.kind() }
        });
        let b = tokio::spawn({
            let routes = Arc::clone(&routes);
            async move { routes.navigate("/slow").await.kind() }
        });

        assert_eq!(a.await.unwrap(), "ready");
        assert_eq!(b.await.unwrap(), "ready");
        assert_eq!(routes.load_count("/slow"), 1);
    }

    #[tokio::test]
    async fn test_slow_route_does_not_block_other_routes() {
        let routes = Arc::new(
            RouteTable::builder()
                .route("/slow", || async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Page("slow"))
                })
                .route("/fast", || async { Ok(Page("fast")) })
                .build(),
        );

        let slow = tokio::spawn({
            let routes = Arc::clone(&routes);
            async move { routes.navigate("/slow").await.kind() }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let fast = tokio::time::timeout(Duration::from_secs(1), routes.navigate("/fast")).await;
        assert_eq!(fast.unwrap().kind(), "ready");
        assert!(matches!(routes.render("/slow").await, RouteView::Placeholder { .. }));
        slow.abort();
    }

    #[tokio::test]
    async fn test_unmatched_paths_render_not_found() {
        let routes = table();
        for path in ["/nope", "", "about", "/about/", "/ABOUT", "/about?x=1", "💥"] {
            let view = routes.navigate(path).await;
            assert!(matches!(view, RouteView::NotFound { .. }), "{path:?} should be not-found");
            assert_eq!(view.path(), path);
        }
    }

    #[tokio::test]
    async fn test_failed_load_shows_error_and_retries() {
        let fail = Arc::new(AtomicBool::new(true));
        let routes = RouteTable::builder()
            .route("/flaky", {
                let fail = Arc::clone(&fail);
                move || {
                    let fail = fail.load(Ordering::SeqCst);
                    async move {
                        if fail { Err(Error::ModuleLoadFailed("chunk unavailable".into())) } else { Ok(Page("flaky")) }
                    }
                }
            })
            .build();

        let view = routes.navigate("/flaky").await;
        assert!(matches!(&view, RouteView::Failed { error, .. } if error.contains("chunk unavailable")));
        assert!(matches!(routes.render("/flaky").await, RouteView::Failed { .. }));

        fail.store(false, Ordering::SeqCst);
        let view = routes.navigate("/flaky").await;
        assert_eq!(view.kind(), "ready");
        assert_eq!(routes.load_count("/flaky"), 2);
    }

    #[test]
    fn test_duplicate_path_keeps_one_entry() {
        let routes = RouteTable::builder()
            .route("/", || async { Ok(Page("first")) })
            .route("/", || async { Ok(Page("second")) })
            .build();
        assert_eq!(routes.len(), 1);
        assert!(!routes.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_path_uses_later_loader() {
        let routes = RouteTable::builder()
            .route("/", || async { Ok(Page("first")) })
            .route("/", || async { Ok(Page("second")) })
            .build();
        assert_eq!(routes.navigate("/").await.module().unwrap().0, "second");
    }
}
