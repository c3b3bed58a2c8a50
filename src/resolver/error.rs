//! Error types for share-link resolution.
//!
//! Every variant renders as a one-line reason followed by a `Suggestion:`
//! line, following the What/Why/Fix pattern used across the project. Only the
//! first line is persisted on a failed link (see [`ResolveError::reason`]).

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while resolving a share page to a direct URL.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The share page itself answered with a non-success status.
    #[error(
        "share page '{url}' failed to load (HTTP {status})\n  Suggestion: Check that the share link still exists"
    )]
    PageLoad {
        /// The share page URL.
        url: String,
        /// HTTP status returned by the page.
        status: u16,
    },

    /// An expected embedded value or form was not found on the page.
    #[error(
        "could not parse share page '{url}': {reason}\n  Suggestion: The host may have changed its page layout"
    )]
    Parse {
        /// The share page URL.
        url: String,
        /// What was missing or unreadable.
        reason: String,
    },

    /// The embedded download hosts list exists but is unusable.
    #[error(
        "malformed download hosts on '{url}': {reason}\n  Suggestion: The host may be out of capacity; try again later"
    )]
    MalformedHosts {
        /// The share page URL.
        url: String,
        /// Why the hosts list was rejected.
        reason: String,
    },

    /// The download-resolution request or form submission did not succeed.
    #[error(
        "resolution request '{request_url}' failed: {reason}\n  Suggestion: The share token may have expired; retry later"
    )]
    ResolutionRequest {
        /// The URL that was requested.
        request_url: String,
        /// Why the request failed.
        reason: String,
    },

    /// The overall per-resolution deadline elapsed.
    #[error(
        "resolving '{url}' timed out after {deadline:?}\n  Suggestion: The host may be slow; increase the resolver deadline"
    )]
    Timeout {
        /// The share URL being resolved.
        url: String,
        /// The deadline that was exceeded.
        deadline: Duration,
    },

    /// Low-level transport failure (DNS, connect, TLS, reset).
    #[error(
        "network error reaching '{url}': {message}\n  Suggestion: Check connectivity to the share host"
    )]
    Network {
        /// The URL being requested.
        url: String,
        /// Transport error text.
        message: String,
    },
}

impl ResolveError {
    /// Creates a `PageLoad` error.
    #[must_use]
    pub fn page_load(url: &str, status: u16) -> Self {
        Self::PageLoad {
            url: url.to_string(),
            status,
        }
    }

    /// Creates a `Parse` error.
    #[must_use]
    pub fn parse(url: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `MalformedHosts` error.
    #[must_use]
    pub fn malformed_hosts(url: &str, reason: impl Into<String>) -> Self {
        Self::MalformedHosts {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `ResolutionRequest` error.
    #[must_use]
    pub fn resolution_request(request_url: &str, reason: impl Into<String>) -> Self {
        Self::ResolutionRequest {
            request_url: request_url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    #[must_use]
    pub fn timeout(url: &str, deadline: Duration) -> Self {
        Self::Timeout {
            url: url.to_string(),
            deadline,
        }
    }

    /// Maps a transport-level `reqwest` failure.
    ///
    /// Per-request client timeouts land here too; [`ResolveError::Timeout`] is
    /// reserved for the overall resolution deadline.
    #[must_use]
    pub fn transport(url: &str, error: &reqwest::Error) -> Self {
        Self::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }

    /// Returns the one-line reason, without the suggestion.
    #[must_use]
    pub fn reason(&self) -> String {
        let rendered = self.to_string();
        rendered
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    /// Ranks how far resolution progressed before failing.
    ///
    /// When every strategy fails the chain reports the highest-ranked error;
    /// ties go to the later strategy.
    #[must_use]
    pub fn specificity(&self) -> u8 {
        match self {
            Self::Network { .. } => 0,
            Self::Timeout { .. } => 1,
            Self::PageLoad { .. } => 2,
            Self::Parse { .. } => 3,
            Self::MalformedHosts { .. } => 4,
            Self::ResolutionRequest { .. } => 5,
        }
    }
}
