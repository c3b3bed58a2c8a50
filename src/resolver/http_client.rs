//! Shared HTTP client construction policy for resolution strategies.
//!
//! Both strategies share one client so that cookies set by a share page are
//! replayed on the follow-up download request, and so timeouts, user agent and
//! redirect policy stay consistent.

use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;

use crate::user_agent;

use super::ResolveError;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 20;
const MAX_REDIRECTS: usize = 10;

/// Network settings applied to the resolver HTTP client.
#[derive(Debug, Clone)]
pub struct ResolverHttpSettings {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout for a single HTTP exchange.
    pub read_timeout: Duration,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ResolverHttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            user_agent: user_agent::default_browser_user_agent().to_string(),
        }
    }
}

/// Builds the resolver HTTP client.
///
/// Redirects are followed automatically so the response URL is the final
/// direct-download location.
///
/// # Errors
///
/// Returns [`ResolveError::Network`] when client construction fails (for
/// example, a broken TLS backend).
pub fn build_resolver_http_client(settings: &ResolverHttpSettings) -> Result<Client, ResolveError> {
    Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.read_timeout)
        .user_agent(settings.user_agent.clone())
        .redirect(Policy::limited(MAX_REDIRECTS))
        .cookie_store(true)
        .gzip(true)
        .build()
        .map_err(|error| ResolveError::Network {
            url: String::new(),
            message: format!("HTTP client construction failed: {error}"),
        })
}
