//! The operations exposed to callers: add, delete, list, trigger.
//!
//! [`LinkService`] is what the CLI (or any embedding program) talks to. It
//! writes new links directly to the store and hands maintenance off to the
//! [`MaintenanceEngine`].

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::maintenance::MaintenanceEngine;
use crate::resolver::parse_share_url;
use crate::store::{Link, LinkStore, StoreError};

/// Outcome of [`LinkService::add_links`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddSummary {
    /// Urls stored as new `pending` links.
    pub added: Vec<String>,
    /// Urls that were already stored and left untouched.
    pub existing: Vec<String>,
    /// Inputs rejected because they are not absolute http(s) URLs.
    pub invalid: Vec<String>,
}

/// Every stored link plus the number currently `active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkSnapshot {
    /// Links ordered by `added_at`, then url.
    pub links: Vec<Link>,
    /// How many of `links` are `active`.
    pub active_count: usize,
}

/// Entry point for link management.
#[derive(Clone)]
pub struct LinkService {
    store: Arc<dyn LinkStore>,
    engine: MaintenanceEngine,
}

impl LinkService {
    /// Creates a service over `store`; `engine` must be built on the same store.
    #[must_use]
    pub fn new(store: Arc<dyn LinkStore>, engine: MaintenanceEngine) -> Self {
        Self { store, engine }
    }

    /// Returns the maintenance engine.
    #[must_use]
    pub fn engine(&self) -> &MaintenanceEngine {
        &self.engine
    }

    /// Adds each url that is not stored yet as a `pending` link.
    ///
    /// Inputs are trimmed; blank inputs are skipped and a url repeated within
    /// one call is handled once. Existing links are never modified.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store fails; links inserted before the
    /// failure stay inserted.
    #[instrument(skip(self, urls))]
    pub async fn add_links<I, S>(&self, urls: I) -> Result<AddSummary, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut summary = AddSummary::default();
        let mut seen = HashSet::new();
        let now = Utc::now();

        for raw in urls {
            let url = raw.as_ref().trim();
            if url.is_empty() || !seen.insert(url.to_string()) {
                continue;
            }

            if parse_share_url(url).is_err() {
                debug!(url, "rejecting input that is not an http(s) URL");
                summary.invalid.push(url.to_string());
                continue;
            }

            if self.store.insert_if_absent(&Link::new_pending(url, now)).await? {
                summary.added.push(url.to_string());
            } else {
                summary.existing.push(url.to_string());
            }
        }

        info!(
            added = summary.added.len(),
            existing = summary.existing.len(),
            invalid = summary.invalid.len(),
            "links added"
        );
        Ok(summary)
    }

    /// Removes `url` if present. Deleting an absent url is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store fails.
    #[instrument(skip(self))]
    pub async fn delete_link(&self, url: &str) -> Result<(), StoreError> {
        self.store.delete(url.trim()).await
    }

    /// Returns all links and the `active` count.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store fails.
    #[instrument(skip(self))]
    pub async fn list_links(&self) -> Result<LinkSnapshot, StoreError> {
        let mut links = self.store.list_all().await?;
        links.sort_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.url.cmp(&b.url)));
        let active_count = links.iter().filter(|link| link.is_active()).count();
        Ok(LinkSnapshot {
            links,
            active_count,
        })
    }

    /// Starts one maintenance run without waiting for it.
    ///
    /// Returns `false` when a run was already in progress and nothing new started.
    pub fn trigger_maintenance_async(&self) -> bool {
        self.engine.trigger().is_some()
    }
}

impl std::fmt::Debug for LinkService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkService")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
