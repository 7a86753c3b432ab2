//! Worker registration check.
//!
//! On loopback origins the worker script is fetched before registering so a
//! stale worker from another local project does not keep serving its cache.

use reqwest::{StatusCode, Url};
use serde::Serialize;
use url::Host;

use crate::fetch::{FetchRequest, Network};

/// What the host should do with the worker registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationDecision {
    /// Script found: register (or keep) the worker.
    Register,
    /// Script missing or not JavaScript: unregister and reload.
    Unregister,
    /// Origin unreachable: keep running from cache.
    Offline,
}

/// True for `localhost`, `[::1]`, and any `127.0.0.0/8` address.
pub fn is_localhost(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(addr)) => addr.is_loopback(),
        Some(Host::Ipv6(addr)) => addr.is_loopback() || addr.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback()),
        None => false,
    }
}

/// Decide whether the worker at `script_path` should be registered.
pub async fn check_registration<N: Network + ?Sized>(
    network: &N,
    origin: &Url,
    script_path: &str,
) -> RegistrationDecision {
    if !is_localhost(origin) {
        return RegistrationDecision::Register;
    }

    let script_url = match origin.join(script_path) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(origin = %origin, script = script_path, error = %e, "bad worker script path");
            return RegistrationDecision::Unregister;
        }
    };

    let response = match network.fetch(&FetchRequest::get(script_url.clone())).await {
        Ok(response) => response,
        Err(e) => {
            tracing::info!(url = %script_url, error = %e, "no connection; running in offline mode");
            return RegistrationDecision::Offline;
        }
    };

    let is_javascript = response.content_type().is_some_and(|ct| ct.contains("javascript"));

    if response.status == StatusCode::NOT_FOUND || !is_javascript {
        tracing::info!(
            url = %script_url,
            status = response.status.as_u16(),
            content_type = response.content_type().unwrap_or(""),
            "worker script not found; unregistering"
        );
        return RegistrationDecision::Unregister;
    }

    RegistrationDecision::Register
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubNetwork;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_is_localhost() {
        assert!(is_localhost(&url("http://localhost:3000/")));
        assert!(is_localhost(&url("http://LOCALHOST/")));
        assert!(is_localhost(&url("http://[::1]:8080/")));
        assert!(is_localhost(&url("http://127.0.0.1/")));
        assert!(is_localhost(&url("http://127.8.9.10/")));

        assert!(!is_localhost(&url("https://example.com/")));
        assert!(!is_localhost(&url("http://128.0.0.1/")));
        assert!(!is_localhost(&url("http://localhost.example.com/")));
    }

    #[tokio::test]
    async fn test_valid_script_registers() {
        let network = StubNetwork::new().script("/service-worker.js", 200, "application/javascript");
        let decision = check_registration(&network, &url("http://localhost:3000"), "/service-worker.js").await;
        assert_eq!(decision, RegistrationDecision::Register);
    }

    #[tokio::test]
    async fn test_missing_script_unregisters() {
        let network = StubNetwork::new();
        let decision = check_registration(&network, &url("http://localhost:3000"), "/service-worker.js").await;
        assert_eq!(decision, RegistrationDecision::Unregister);
    }

    #[tokio::test]
    async fn test_wrong_content_type_unregisters() {
        let network = StubNetwork::new().script("/service-worker.js", 200, "text/html");
        let decision = check_registration(&network, &url("http://127.0.0.1:3000"), "/service-worker.js").await;
        assert_eq!(decision, RegistrationDecision::Unregister);
    }

    #[tokio::test]
    async fn test_network_failure_is_offline() {
        let network = StubNetwork::new();
        network.set_offline(true);
        let decision = check_registration(&network, &url("http://localhost:3000"), "/service-worker.js").await;
        assert_eq!(decision, RegistrationDecision::Offline);
    }

    #[tokio::test]
    async fn test_remote_origin_registers_without_fetch() {
        let network = StubNetwork::new();
        let decision = check_registration(&network, &url("https://paths.example.com"), "/service-worker.js").await;
        assert_eq!(decision, RegistrationDecision::Register);
        assert_eq!(network.calls(), 0);
    }
}
