//! Immutable set of pre-cached paths.

use std::collections::BTreeSet;

/// Paths eligible for install-time pre-caching and cache-first serving.
///
/// Matching is an exact comparison against the URL pathname: no prefix or
/// glob matching, no trailing-slash normalization, query strings ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    paths: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { paths: paths.into_iter().map(Into::into).collect() }
    }

    /// Whether `url`'s pathname is on the list.
    pub fn matches(&self, url: &url::Url) -> bool {
        self.paths.contains(url.path())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
