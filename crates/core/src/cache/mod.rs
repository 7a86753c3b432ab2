//! SQLite-backed cache storage for the offline shell.
//!
//! Storage is organised as named generations, one per deployed version, each
//! holding request/response entries. It supports:
//!
//! - Atomic bulk population of a generation (all entries or none)
//! - Single-entry writes with last-write-wins semantics
//! - Enumeration and deletion of superseded generations
//! - Automatic schema migrations

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CachedRequest, CachedResponse};
pub use generations::Generation;
