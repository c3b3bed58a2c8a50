//! In-memory [`LinkStore`] backed by `DashMap`.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{Link, LinkStore, StoreError};

/// In-memory link store.
///
/// `DashMap` shards its locks, so concurrent writes from one maintenance
/// batch to different keys do not serialize on a single lock.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    links: DashMap<String, Link>,
}

impl MemoryLinkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if no links are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn get(&self, url: &str) -> Result<Option<Link>, StoreError> {
        Ok(self.links.get(url).map(|entry| entry.value().clone()))
    }

    async fn set(&self, link: &Link) -> Result<(), StoreError> {
        match self.links.entry(link.url.clone()) {
            Entry::Occupied(mut slot) => {
                let added_at = slot.get().added_at;
                let stored = slot.get_mut();
                *stored = link.clone();
                stored.added_at = added_at;
            }
            Entry::Vacant(slot) => {
                slot.insert(link.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<(), StoreError> {
        self.links.remove(url);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Link>, StoreError> {
        Ok(self
            .links
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn insert_if_absent(&self, link: &Link) -> Result<bool, StoreError> {
        match self.links.entry(link.url.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(link.clone());
                Ok(true)
            }
        }
    }
}
