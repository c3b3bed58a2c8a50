//! The ordered strategy chain behind [`Resolver`].
//!
//! The [`Resolver`] owns a list of strategies and tries them in registration
//! order under one overall deadline. The first direct URL wins.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::utils::parse_share_url;
use super::{LinkResolver, ResolveError, ResolveStrategy, ResolvedUrl};

/// Default overall deadline for one resolution.
pub const DEFAULT_RESOLVE_DEADLINE: Duration = Duration::from_secs(30);

/// An ordered chain of resolution strategies with a per-call deadline.
pub struct Resolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
    deadline: Duration,
}

impl Resolver {
    /// Creates an empty chain with the given deadline.
    #[must_use]
    pub fn new(deadline: Duration) -> Self {
        Self {
            strategies: Vec::new(),
            deadline,
        }
    }

    /// Appends a strategy; strategies run in registration order.
    #[instrument(skip(self, strategy), fields(strategy_name))]
    pub fn register(&mut self, strategy: Box<dyn ResolveStrategy>) {
        tracing::Span::current().record("strategy_name", strategy.name());
        debug!(name = strategy.name(), "Registering resolution strategy");
        self.strategies.push(strategy);
    }

    /// Returns the number of registered strategies.
    #[must_use]
    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// Returns the overall per-call deadline.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Resolves a share URL to its direct-download URL.
    ///
    /// Runs the chain under the deadline; whatever strategy is in flight when
    /// it expires is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Timeout`] when the deadline elapses, otherwise
    /// the most specific error reported by the strategies (see
    /// [`ResolveError::specificity`]).
    #[instrument(skip(self), fields(deadline_ms = self.deadline.as_millis()))]
    pub async fn resolve(&self, share_url: &str) -> Result<ResolvedUrl, ResolveError> {
        match tokio::time::timeout(self.deadline, self.run_chain(share_url)).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::timeout(share_url, self.deadline)),
        }
    }

    async fn run_chain(&self, share_url: &str) -> Result<ResolvedUrl, ResolveError> {
        let url = parse_share_url(share_url)?;
        let mut best: Option<ResolveError> = None;

        for strategy in &self.strategies {
            debug!(strategy = strategy.name(), "Trying strategy");
            match strategy.resolve(&url).await {
                Ok(resolved) => {
                    info!(
                        strategy = strategy.name(),
                        url = %resolved.url,
                        "Resolution successful"
                    );
                    return Ok(resolved);
                }
                Err(error) => {
                    debug!(
                        strategy = strategy.name(),
                        error = %error.reason(),
                        "Strategy failed, trying next"
                    );
                    best = Some(match best {
                        Some(previous) if previous.specificity() > error.specificity() => previous,
                        _ => error,
                    });
                }
            }
        }

        Err(best.unwrap_or_else(|| {
            ResolveError::parse(share_url, "no resolution strategy is registered")
        }))
    }
}

#[async_trait]
impl LinkResolver for Resolver {
    async fn resolve(&self, share_url: &str) -> Result<ResolvedUrl, ResolveError> {
        Resolver::resolve(self, share_url).await
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("Resolver")
            .field("deadline", &self.deadline)
            .field("strategies", &names)
            .finish()
    }
}
