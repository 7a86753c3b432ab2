//! In-process network stub for interceptor and loader tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use trailhead_core::Error;

use crate::fetch::{FetchRequest, FetchResponse, Network};

/// Serves canned pages keyed by URL path. Unknown paths answer 404.
#[derive(Default)]
pub(crate) struct StubNetwork {
    pages: Mutex<HashMap<String, (u16, String, String)>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl StubNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(self, path: &str, status: u16, body: &str) -> Self {
        self.set_page(path, status, body);
        self
    }

    pub(crate) fn script(self, path: &str, status: u16, content_type: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, content_type.to_string(), String::new()));
        self
    }

    pub(crate) fn set_page(&self, path: &str, status: u16, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, "text/html".to_string(), body.to_string()));
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: offline", request.url)));
        }

        let (status, content_type, body) = self
            .pages
            .lock()
            .unwrap()
            .get(request.url.path())
            .cloned()
            .unwrap_or_else(|| (404, "text/plain".to_string(), "not found".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(&content_type).unwrap());

        Ok(FetchResponse {
            url: request.url.clone(),
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            bytes: Bytes::from(body),
            fetch_ms: 1,
        })
    }
}
