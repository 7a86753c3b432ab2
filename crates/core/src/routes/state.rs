//! Per-route load state.

use std::sync::Arc;

/// Where a route's deferred module is in its lifecycle.
#[derive(Debug)]
pub enum LoadState<M> {
    /// Never requested.
    NotStarted,
    /// A navigation is resolving the module.
    Loading,
    /// Resolved and memoized for the life of the table.
    Ready(Arc<M>),
    /// The last resolution failed; the next navigation retries.
    Failed(String),
}
