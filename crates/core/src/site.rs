//! Fixed path table for the career-paths site.
//!
//! The same paths feed the interceptor's pre-cache allow-list and the lazy
//! route table, so they live in one place.

/// Shell and informational pages.
pub const STATIC_PAGES: &[&str] = &["/", "/index.html", "/developer-paths", "/about", "/contact"];

/// One page per career topic.
pub const CAREER_PAGES: &[&str] = &[
    "/frontend-developer",
    "/backend-developer",
    "/fullstack-developer",
    "/data-scientist",
    "/data-analyst",
    "/machine-learning-engineer",
    "/ai-engineer",
    "/devops-engineer",
    "/cloud-engineer",
    "/site-reliability-engineer",
    "/cybersecurity-analyst",
    "/mobile-developer",
    "/game-developer",
    "/ui-ux-designer",
    "/blockchain-developer",
    "/qa-engineer",
    "/database-administrator",
    "/embedded-systems-engineer",
    "/product-manager",
];

/// Paths pre-cached on install.
pub fn precache_paths() -> Vec<String> {
    STATIC_PAGES.iter().chain(CAREER_PAGES).map(|p| p.to_string()).collect()
}

/// Paths with a lazily loaded page module.
///
/// `/index.html` is only a cache alias for the shell; it has no route.
pub fn route_paths() -> Vec<String> {
    STATIC_PAGES
        .iter()
        .chain(CAREER_PAGES)
        .filter(|p| **p != "/index.html")
        .map(|p| p.to_string())
        .collect()
}
