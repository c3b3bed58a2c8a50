//! `SQLite`-backed [`LinkStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

use crate::db::Database;

use super::{Link, LinkStatus, LinkStore, StoreError};

/// Raw `links` row; status is kept as text until validated.
#[derive(Debug, FromRow)]
struct LinkRow {
    url: String,
    status: String,
    added_at: DateTime<Utc>,
    last_check: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl TryFrom<LinkRow> for Link {
    type Error = StoreError;

    fn try_from(row: LinkRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<LinkStatus>()
            .map_err(|_| StoreError::invalid_status(&row.url, &row.status))?;
        Ok(Self {
            url: row.url,
            status,
            added_at: row.added_at,
            last_check: row.last_check,
            error: row.error,
        })
    }
}

/// Link store persisted in the `links` table.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct SqliteLinkStore {
    db: Database,
}

impl SqliteLinkStore {
    /// Creates a store over an opened (and migrated) database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the number of links in `status`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    #[instrument(skip(self))]
    pub async fn count_by_status(&self, status: LinkStatus) -> Result<i64, StoreError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM links WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(self.db.pool())
            .await?;
        Ok(count.0)
    }
}

#[async_trait]
impl LinkStore for SqliteLinkStore {
    #[instrument(skip(self))]
    async fn get(&self, url: &str) -> Result<Option<Link>, StoreError> {
        let row = sqlx::query_as::<_, LinkRow>(
            "SELECT url, status, added_at, last_check, error FROM links WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(Link::try_from).transpose()
    }

    #[instrument(skip(self, link), fields(url = %link.url, status = %link.status))]
    async fn set(&self, link: &Link) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO links (url, status, added_at, last_check, error)
              VALUES (?, ?, ?, ?, ?)
              ON CONFLICT(url) DO UPDATE SET
                status = excluded.status,
                last_check = excluded.last_check,
                error = excluded.error",
        )
        .bind(&link.url)
        .bind(link.status.as_str())
        .bind(link.added_at)
        .bind(link.last_check)
        .bind(link.error.as_deref())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, url: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM links WHERE url = ?")
            .bind(url)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Link>, StoreError> {
        let rows = sqlx::query_as::<_, LinkRow>(
            "SELECT url, status, added_at, last_check, error FROM links",
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(Link::try_from).collect()
    }

    #[instrument(skip(self, link), fields(url = %link.url))]
    async fn insert_if_absent(&self, link: &Link) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"INSERT OR IGNORE INTO links (url, status, added_at, last_check, error)
              VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&link.url)
        .bind(link.status.as_str())
        .bind(link.added_at)
        .bind(link.last_check)
        .bind(link.error.as_deref())
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn store() -> SqliteLinkStore {
        SqliteLinkStore::new(Database::new_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_insert_if_absent_then_get() {
        let store = store().await;
        let link = Link::new_pending("https://share.example/s/one", Utc::now());

        assert!(store.insert_if_absent(&link).await.unwrap());
        let fetched = store.get(&link.url).await.unwrap().unwrap();
        assert_eq!(fetched.url, link.url);
        assert_eq!(fetched.status, LinkStatus::Pending);
        assert!(fetched.last_check.is_none());
    }

    #[tokio::test]
    async fn test_insert_if_absent_does_not_overwrite() {
        let store = store().await;
        let mut link = Link::new_pending("https://share.example/s/one", Utc::now());
        store.insert_if_absent(&link).await.unwrap();

        link.record_success(Utc::now());
        store.set(&link).await.unwrap();

        let again = Link::new_pending("https://share.example/s/one", Utc::now());
        assert!(!store.insert_if_absent(&again).await.unwrap());
        let fetched = store.get(&link.url).await.unwrap().unwrap();
        assert_eq!(fetched.status, LinkStatus::Active);
        assert!(fetched.last_check.is_some());
    }

    #[tokio::test]
    async fn test_set_updates_status_and_error() {
        let store = store().await;
        let mut link = Link::new_pending("https://share.example/s/one", Utc::now());
        store.insert_if_absent(&link).await.unwrap();

        link.record_failure("page load failed", 3, Utc::now());
        store.set(&link).await.unwrap();

        let fetched = store.get(&link.url).await.unwrap().unwrap();
        assert_eq!(fetched.status, LinkStatus::Failed);
        assert_eq!(
            fetched.error.as_deref(),
            Some("failed after 3 attempts: page load failed")
        );
        assert_eq!(store.count_by_status(LinkStatus::Failed).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_keeps_original_added_at() {
        let store = store().await;
        let original = Link::new_pending("https://share.example/s/one", Utc::now());
        store.insert_if_absent(&original).await.unwrap();

        let mut update = original.clone();
        update.added_at = original.added_at + chrono::Duration::days(3);
        update.record_success(Utc::now());
        store.set(&update).await.unwrap();

        let fetched = store.get(&original.url).await.unwrap().unwrap();
        assert_eq!(fetched.added_at, original.added_at);
        assert_eq!(fetched.status, LinkStatus::Active);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = store().await;
        store.delete("https://share.example/s/missing").await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_status_row_is_reported() {
        let db = Database::new_in_memory().await.unwrap();
        sqlx::query("PRAGMA ignore_check_constraints = ON")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO links (url, status, added_at) VALUES ('https://share.example/s/x', 'zombie', '2026-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let store = SqliteLinkStore::new(db);
        let err = store.get("https://share.example/s/x").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidStatus { .. }));
    }
}
