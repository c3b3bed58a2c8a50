//! Link store: persistence for monitored share links.
//!
//! The store is a plain key-value mapping from share URL to [`Link`]. Both the
//! maintenance engine and the [`LinkService`](crate::service::LinkService)
//! depend only on the [`LinkStore`] trait; no transaction spans more than one
//! key.
//!
//! # Overview
//!
//! - [`LinkStore`] - Data-access contract (get/set/delete/list)
//! - [`SqliteLinkStore`] - `SQLite`-backed store used by the binary
//! - [`MemoryLinkStore`] - `DashMap`-backed store for tests and embedding
//! - [`Link`] / [`LinkStatus`] - The persisted record
//!
//! # Example
//!
//! ```ignore
//! use sharekeeper_core::store::{Link, LinkStore, SqliteLinkStore};
//! use sharekeeper_core::Database;
//!
//! let store = SqliteLinkStore::new(Database::new_in_memory().await?);
//! store.insert_if_absent(&Link::new_pending("https://share.example/s/abc", chrono::Utc::now())).await?;
//! let all = store.list_all().await?;
//! ```

mod error;
mod link;
mod memory;
mod sqlite;

pub use error::StoreError;
pub use link::{Link, LinkStatus};
pub use memory::MemoryLinkStore;
pub use sqlite::SqliteLinkStore;

use async_trait::async_trait;

/// Data-access contract for link records.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Returns the link stored under `url`, if any.
    async fn get(&self, url: &str) -> Result<Option<Link>, StoreError>;

    /// Writes `link` under its own url, replacing any existing record.
    ///
    /// `added_at` is fixed at first write; updates keep the stored value.
    async fn set(&self, link: &Link) -> Result<(), StoreError>;

    /// Removes the link under `url`. Removing a missing key is not an error.
    async fn delete(&self, url: &str) -> Result<(), StoreError>;

    /// Returns every stored link, in no particular order.
    async fn list_all(&self) -> Result<Vec<Link>, StoreError>;

    /// Stores `link` only if its url is not present yet.
    ///
    /// Returns `true` when the link was inserted. Existing records are never
    /// overwritten.
    async fn insert_if_absent(&self, link: &Link) -> Result<bool, StoreError> {
        if self.get(&link.url).await?.is_some() {
            return Ok(false);
        }
        self.set(link).await?;
        Ok(true)
    }
}
