//! Lifecycle events, worker states, and event outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fetch::{FetchRequest, FetchResponse};

/// A signal from the host runtime.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// First registration or update: pre-cache the allow-list.
    Install,
    /// Take control: drop superseded cache generations.
    Activate,
    /// An outgoing request to answer.
    Fetch(FetchRequest),
}

/// Worker state, advanced only by lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; a new install may be attempted.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
}

/// The single response produced for a fetch event.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: FetchResponse,
    pub source: ResponseSource,
}

impl Served {
    pub fn from_cache(response: FetchResponse) -> Self {
        Self { response, source: ResponseSource::Cache }
    }

    pub fn from_network(response: FetchResponse) -> Self {
        Self { response, source: ResponseSource::Network }
    }
}

/// Result of dispatching one event.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Installed { cache_name: String, cached: usize },
    Activated { cache_name: String, deleted: Vec<String> },
    Responded(Served),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display_matches_serde() {
        for state in [WorkerState::Parsed, WorkerState::Activated, WorkerState::Redundant] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }

    #[test]
    fn test_source_serialization() {
        assert_eq!(serde_json::to_string(&ResponseSource::Cache).unwrap(), "\"cache\"");
    }
}
