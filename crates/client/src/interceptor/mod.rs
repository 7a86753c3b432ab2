//! Cache-aware request interceptor.
//!
//! Driven by host lifecycle events ([`WorkerEvent`]):
//!
//! ### Install
//! - Fetch every allow-listed path against the origin, concurrently.
//! - All-or-nothing: any failed or non-2xx response fails the install,
//!   stores nothing, and leaves the worker `Redundant`.
//!
//! ### Activate
//! - Delete every cache generation except the current one. Idempotent.
//!
//! ### Fetch
//! - Allow-listed pathname: cache-first. A miss goes to the network and a 2xx
//!   response is written back in the background.
//! - Other paths: [`PassthroughPolicy`], never written back.
//! - Before activation, or for non-GET requests, the network answers directly.

mod allow_list;
mod event;

pub use allow_list::AllowList;
pub use event::{EventOutcome, ResponseSource, Served, WorkerEvent, WorkerState};

use std::sync::Arc;

use reqwest::{Method, Url};
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::JoinSet;
use trailhead_core::{AppConfig, CacheDb, Error, PassthroughPolicy};

use crate::fetch::{FetchRequest, FetchResponse, Network};

/// Interceptor settings, fixed for the lifetime of a cache generation.
#[derive(Debug, Clone)]
pub struct InterceptorConfig {
    /// Name of the current cache generation.
    pub cache_name: String,
    /// Origin allow-listed paths resolve against.
    pub origin: Url,
    pub allow_list: AllowList,
    pub passthrough: PassthroughPolicy,
    /// Upper bound on concurrent install fetches.
    pub install_concurrency: usize,
    /// Largest body stored as an entry. Larger responses are served, not cached.
    pub max_entry_bytes: usize,
}

impl InterceptorConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin =
            Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin {}: {e}", config.origin)))?;

        Ok(Self {
            cache_name: config.cache_name(),
            origin,
            allow_list: AllowList::new(config.precache_paths.iter().cloned()),
            passthrough: config.passthrough_policy,
            install_concurrency: config.install_concurrency.max(1),
            max_entry_bytes: config.max_bytes,
        })
    }
}

/// The offline-caching interceptor.
pub struct CacheInterceptor<N> {
    config: InterceptorConfig,
    network: Arc<N>,
    db: CacheDb,
    state: RwLock<WorkerState>,
    background: Mutex<JoinSet<()>>,
}

impl<N: Network + 'static> CacheInterceptor<N> {
    pub fn new(config: InterceptorConfig, network: N, db: CacheDb) -> Self {
        Self::with_shared_network(config, Arc::new(network), db)
    }

    pub fn with_shared_network(config: InterceptorConfig, network: Arc<N>, db: CacheDb) -> Self {
        Self {
            config,
            network,
            db,
            state: RwLock::new(WorkerState::Parsed),
            background: Mutex::new(JoinSet::new()),
        }
    }

    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Handle one lifecycle event.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, Error> {
        match event {
            WorkerEvent::Install => {
                let cached = self.install().await?;
                Ok(EventOutcome::Installed { cache_name: self.config.cache_name.clone(), cached })
            }
            WorkerEvent::Activate => {
                let deleted = self.activate().await?;
                Ok(EventOutcome::Activated { cache_name: self.config.cache_name.clone(), deleted })
            }
            WorkerEvent::Fetch(request) => self.fetch(request).await.map(EventOutcome::Responded),
        }
    }

    /// Pre-cache the allow-list. Returns the number of entries stored.
    pub async fn install(&self) -> Result<usize, Error> {
        self.begin(&[WorkerState::Parsed, WorkerState::Redundant], WorkerState::Installing, "install")
            .await?;

        match self.precache().await {
            Ok(cached) => {
                self.set_state(WorkerState::Installed).await;
                tracing::info!(cache = %self.config.cache_name, cached, "install complete");
                Ok(cached)
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                tracing::warn!(cache = %self.config.cache_name, error = %e, "install failed; nothing cached");
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        let semaphore = Arc::new(Semaphore::new(self.config.install_concurrency));
        let mut join_set = JoinSet::new();

        for path in self.config.allow_list.iter() {
            let url = self
                .config
                .origin
                .join(path)
                .map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;
            let request = FetchRequest::get(url);
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| Error::InstallFailed(e.to_string()))?;
            let network = Arc::clone(&self.network);

            join_set.spawn(async move {
                // NOTE: Hold permit for task duration to enforce concurrency limit
                let _permit = permit;
                let result = network.fetch(&request).await;
                (request, result)
            });
        }

        let mut entries = Vec::with_capacity(self.config.allow_list.len());

        // returning early drops the set, which aborts the remaining fetches
        while let Some(joined) = join_set.join_next().await {
            let (request, result) = joined.map_err(|e| Error::InstallFailed(e.to_string()))?;
            let response = result.map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;

            if !response.status.is_success() {
                return Err(Error::InstallFailed(format!(
                    "{} returned status {}",
                    request.url,
                    response.status.as_u16()
                )));
            }
            if response.bytes.len() > self.config.max_entry_bytes {
                return Err(Error::InstallFailed(format!(
                    "{} body of {} bytes exceeds the {} byte entry limit",
                    request.url,
                    response.bytes.len(),
                    self.config.max_entry_bytes
                )));
            }

            entries.push((request.to_cached(), response.to_cached()));
        }

        self.db.put_all(&self.config.cache_name, entries).await
    }

    /// Drop superseded generations. Returns the deleted names.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let previous = self
            .begin(&[WorkerState::Installed, WorkerState::Activated], WorkerState::Activating, "activate")
            .await?;

        match self.db.delete_generations_except(&self.config.cache_name).await {
            Ok(deleted) => {
                for name in &deleted {
                    tracing::info!(cache = %name, "deleted stale cache generation");
                }
                self.set_state(WorkerState::Activated).await;
                Ok(deleted)
            }
            Err(e) => {
                self.set_state(previous).await;
                tracing::warn!(error = %e, "stale generation cleanup failed");
                Err(e)
            }
        }
    }

    /// Take control with an already-stored current generation, skipping install.
    ///
    /// The stored generation counts as installed and activation still runs, so
    /// generations left behind by an interrupted update are dropped. Returns
    /// false, leaving the state untouched, when the worker has already left
    /// `Parsed` or the current generation is not stored.
    pub async fn resume(&self) -> Result<bool, Error> {
        {
            let mut state = self.state.write().await;
            if *state != WorkerState::Parsed || !self.db.has_generation(&self.config.cache_name).await? {
                return Ok(false);
            }
            let entries = self.db.count_entries(&self.config.cache_name).await?;
            tracing::info!(cache = %self.config.cache_name, entries, "resuming stored generation");
            tracing::info!(from = %*state, to = %WorkerState::Installed, "worker state change");
            *state = WorkerState::Installed;
        }

        self.activate().await?;
        Ok(true)
    }

    /// Answer one outgoing request. Exactly one response, or the network error.
    pub async fn fetch(&self, request: FetchRequest) -> Result<Served, Error> {
        let state = self.state().await;
        if state != WorkerState::Activated || request.method != Method::GET {
            tracing::debug!(method = %request.method, url = %request.url, state = %state, "not intercepted");
            return self.network.fetch(&request).await.map(Served::from_network);
        }

        if self.config.allow_list.matches(&request.url) {
            return self.cache_first(&request).await;
        }

        match self.config.passthrough {
            PassthroughPolicy::CacheFirst => self.cache_then_network(&request).await,
            PassthroughPolicy::NetworkFirst => self.network_then_cache(&request).await,
        }
    }

    /// Wait for every background cache write spawned so far.
    pub async fn settle(&self) {
        let mut background = self.background.lock().await;
        while let Some(joined) = background.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "background cache write did not complete");
            }
        }
    }

    async fn cache_first(&self, request: &FetchRequest) -> Result<Served, Error> {
        if let Some(response) = self.lookup(request).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(Served::from_cache(response));
        }

        tracing::debug!(url = %request.url, "cache miss");
        let response = self.network.fetch(request).await?;

        if !response.status.is_success() {
            tracing::debug!(url = %request.url, status = response.status.as_u16(), "not caching unsuccessful response");
        } else if response.bytes.len() > self.config.max_entry_bytes {
            tracing::debug!(url = %request.url, bytes = response.bytes.len(), "not caching oversized response");
        } else {
            self.write_back(request, &response).await;
        }

        Ok(Served::from_network(response))
    }

    async fn cache_then_network(&self, request: &FetchRequest) -> Result<Served, Error> {
        if let Some(response) = self.lookup(request).await {
            tracing::debug!(url = %request.url, "cache hit outside allow-list");
            return Ok(Served::from_cache(response));
        }
        self.network.fetch(request).await.map(Served::from_network)
    }

    async fn network_then_cache(&self, request: &FetchRequest) -> Result<Served, Error> {
        match self.network.fetch(request).await {
            Ok(response) => Ok(Served::from_network(response)),
            Err(e) => match self.lookup(request).await {
                Some(response) => {
                    tracing::debug!(url = %request.url, error = %e, "network failed; served from cache");
                    Ok(Served::from_cache(response))
                }
                None => Err(e),
            },
        }
    }

    /// Cached response for the request. Storage failures count as a miss.
    async fn lookup(&self, request: &FetchRequest) -> Option<FetchResponse> {
        let cached = match self.db.match_entry(&self.config.cache_name, &request.to_cached()).await {
            Ok(found) => found?,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed; treating as miss");
                return None;
            }
        };

        match FetchResponse::from_cached(cached) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "unreadable cache entry; treating as miss");
                None
            }
        }
    }

    /// Store a copy of the response without delaying the caller.
    async fn write_back(&self, request: &FetchRequest, response: &FetchResponse) {
        let db = self.db.clone();
        let cache_name = self.config.cache_name.clone();
        let key = request.to_cached();
        let snapshot = response.to_cached();

        let mut background = self.background.lock().await;
        while background.try_join_next().is_some() {}

        background.spawn(async move {
            if let Err(e) = db.put_entry(&cache_name, &key, &snapshot).await {
                tracing::warn!(url = %key.url, error = %e, "background cache write failed");
            }
        });
    }

    async fn begin(&self, allowed: &[WorkerState], next: WorkerState, event: &str) -> Result<WorkerState, Error> {
        let mut state = self.state.write().await;
        if !allowed.contains(&*state) {
            return Err(Error::InvalidState(format!("cannot {event} while {}", *state)));
        }
        let previous = *state;
        tracing::info!(from = %previous, to = %next, "worker state change");
        *state = next;
        Ok(previous)
    }

    async fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().await;
        tracing::info!(from = %*state, to = %next, "worker state change");
        *state = next;
    }
}
