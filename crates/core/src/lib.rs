//! Core types and shared functionality for trailhead.
//!
//! This crate provides:
//! - Cache storage with SQLite backend (versioned generations of request/response entries)
//! - Lazy route table with memoized module loading
//! - Unified error types
//! - Configuration structures and the site's fixed path table

pub mod cache;
pub mod config;
pub mod error;
pub mod routes;
pub mod site;

pub use cache::{CacheDb, CachedRequest, CachedResponse};
pub use config::{AppConfig, PassthroughPolicy};
pub use error::Error;
pub use routes::{RouteTable, RouteView};
