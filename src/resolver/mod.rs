//! Share-page resolution: turning an opaque share URL into the direct-download
//! URL it currently points at.
//!
//! # Architecture
//!
//! - [`ResolveStrategy`] - Async trait that individual extraction strategies implement
//! - [`Resolver`] - Ordered strategy chain with an overall per-call deadline
//! - [`LinkResolver`] - The seam the maintenance engine resolves through
//! - [`BootstrapTokenResolver`] - Reads token, file id and hosts from inline script data
//! - [`FormSubmitResolver`] - Submits the page's download form
//!
//! # Example
//!
//! ```no_run
//! use sharekeeper_core::resolver::{build_default_resolver, ResolverHttpSettings};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = build_default_resolver(&ResolverHttpSettings::default(), Duration::from_secs(30))?;
//! let resolved = resolver.resolve("https://share.example/s/abc").await?;
//! println!("Direct URL: {}", resolved.url);
//! # Ok(())
//! # }
//! ```

mod bootstrap;
mod chain;
mod error;
mod form;
mod http_client;
mod utils;

pub use bootstrap::{
    BootstrapData, BootstrapTokenResolver, DEFAULT_DOWNLOAD_PATH, DownloadHost, HostId,
};
pub use chain::{DEFAULT_RESOLVE_DEADLINE, Resolver};
pub use error::ResolveError;
pub use form::{DownloadForm, FormSubmitResolver};
pub use http_client::{ResolverHttpSettings, build_resolver_http_client};
pub use utils::parse_share_url;

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

/// Builds the default resolver chain: bootstrap token first, then form
/// submission, sharing one HTTP client.
///
/// # Errors
///
/// Returns [`ResolveError::Network`] if the HTTP client cannot be built.
pub fn build_default_resolver(
    settings: &ResolverHttpSettings,
    deadline: Duration,
) -> Result<Resolver, ResolveError> {
    let client = build_resolver_http_client(settings)?;

    let mut resolver = Resolver::new(deadline);
    resolver.register(Box::new(BootstrapTokenResolver::new(client.clone())));
    resolver.register(Box::new(FormSubmitResolver::new(client)));
    Ok(resolver)
}

/// A share URL resolved to its direct-download location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    /// Final URL after redirects.
    pub url: String,
    /// HTTP status of the final response.
    pub status: u16,
    /// Name of the strategy that produced it.
    pub strategy: String,
}

impl ResolvedUrl {
    /// Creates a resolved URL.
    #[must_use]
    pub fn new(url: impl Into<String>, status: u16, strategy: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            strategy: strategy.into(),
        }
    }
}

/// One way of extracting a direct URL from a share page.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Box<dyn ResolveStrategy>`.
#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    /// Returns the strategy name (e.g., `"bootstrap_token"`).
    fn name(&self) -> &str;

    /// Attempts to resolve an already-validated share URL.
    async fn resolve(&self, share_url: &Url) -> Result<ResolvedUrl, ResolveError>;
}

/// Anything that can resolve a share URL end to end.
///
/// Implemented by [`Resolver`]; the maintenance engine depends on this trait
/// so tests can substitute a scripted resolver.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Resolves `share_url` to its direct-download URL.
    async fn resolve(&self, share_url: &str) -> Result<ResolvedUrl, ResolveError>;
}
