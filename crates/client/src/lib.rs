//! Client code for trailhead.
//!
//! This crate provides the network fetch layer, the offline cache interceptor,
//! the worker registration check, and page modules for the lazy route table.

pub mod fetch;
pub mod interceptor;
pub mod pages;
pub mod registration;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{FetchClient, FetchConfig, FetchRequest, FetchResponse, Network};
pub use interceptor::{
    AllowList, CacheInterceptor, EventOutcome, InterceptorConfig, ResponseSource, Served, WorkerEvent, WorkerState,
};
pub use pages::{PageModule, page_routes};
pub use registration::{RegistrationDecision, check_registration, is_localhost};

pub use reqwest::{Method, StatusCode, Url, header};
