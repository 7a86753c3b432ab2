//! Site page modules resolved through the cache interceptor.

use std::sync::Arc;

use scraper::{Html, Selector};
use serde::Serialize;
use trailhead_core::{Error, RouteTable};

use crate::fetch::{FetchRequest, Network};
use crate::interceptor::{CacheInterceptor, ResponseSource};

/// A resolved page: the document behind one route.
#[derive(Debug, Clone, Serialize)]
pub struct PageModule {
    pub path: String,
    pub title: Option<String>,
    pub html: String,
    /// Whether the document came from the cache or the network.
    pub source: ResponseSource,
}

/// Route table whose loaders fetch each page through `interceptor`.
pub fn page_routes<N, I, S>(interceptor: Arc<CacheInterceptor<N>>, paths: I) -> RouteTable<PageModule>
where
    N: Network + 'static,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut builder = RouteTable::builder();

    for path in paths {
        let path: String = path.into();
        let interceptor = Arc::clone(&interceptor);
        let route_path = path.clone();

        builder = builder.route(path, move || {
            let interceptor = Arc::clone(&interceptor);
            let path = route_path.clone();
            async move { load_page(&interceptor, path).await }
        });
    }

    builder.build()
}

async fn load_page<N: Network + 'static>(interceptor: &CacheInterceptor<N>, path: String) -> Result<PageModule, Error> {
    let url = interceptor
        .config()
        .origin
        .join(&path)
        .map_err(|e| Error::ModuleLoadFailed(format!("{path}: {e}")))?;

    let served = interceptor
        .fetch(FetchRequest::get(url))
        .await
        .map_err(|e| Error::ModuleLoadFailed(format!("{path}: {e}")))?;

    if !served.response.status.is_success() {
        return Err(Error::ModuleLoadFailed(format!(
            "{path}: status {}",
            served.response.status.as_u16()
        )));
    }

    let html = String::from_utf8_lossy(&served.response.bytes).into_owned();
    let title = page_title(&html);

    Ok(PageModule { path, title, html, source: served.source })
}

/// Document title: `<title>`, else the first `<h1>`.
pub fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    ["title", "h1"].into_iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        let text = document.select(&selector).next()?.text().collect::<String>();
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        (!text.is_empty()).then_some(text)
    })
}
