//! Integration tests for the maintenance engine.
//!
//! Runs the real resolver chain against wiremock share pages and persists
//! results in an on-disk `SQLite` store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sharekeeper_core::maintenance::{MaintenanceEngine, MaintenanceSettings, RetryPolicy};
use sharekeeper_core::resolver::{ResolverHttpSettings, build_default_resolver};
use sharekeeper_core::store::{LinkStatus, LinkStore, SqliteLinkStore};
use sharekeeper_core::{Database, LinkService};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

const LIVE_PAGE: &str = r#"<script>
  const token = "tok-1";
  const fileId = 1001;
  const downloadHosts = [{"id":1}];
</script>"#;

async fn open_store(dir: &TempDir) -> Arc<SqliteLinkStore> {
    let db = Database::new(&dir.path().join("links.db")).await.unwrap();
    Arc::new(SqliteLinkStore::new(db))
}

fn service_over(store: Arc<SqliteLinkStore>, max_attempts: u32) -> LinkService {
    let resolver =
        build_default_resolver(&ResolverHttpSettings::default(), Duration::from_secs(5)).unwrap();
    let settings = MaintenanceSettings {
        batch_size: 2,
        retry: RetryPolicy::new(max_attempts, Duration::from_millis(10)),
        batch_cooldown: Duration::from_millis(10),
    };
    let engine = MaintenanceEngine::new(store.clone(), Arc::new(resolver), settings).unwrap();
    LinkService::new(store, engine)
}

async fn mount_live_host(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/s/live"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LIVE_PAGE))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/share/download"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/files/live.bin", server.uri())),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/live.bin"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_run_records_active_and_failed_links() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_live_host(&server).await;
    // Both strategies fetch the share page on each of the 2 attempts.
    Mock::given(method("GET"))
        .and(path("/s/dead"))
        .respond_with(ResponseTemplate::new(404))
        .expect(4)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let service = service_over(store.clone(), 2);

    let live = format!("{}/s/live", server.uri());
    let dead = format!("{}/s/dead", server.uri());
    service.add_links([&live, &dead]).await.unwrap();

    let run_start = Utc::now();
    let stats = service.engine().run_once().await.unwrap();
    assert_eq!(stats.total(), 2);
    assert_eq!(stats.active(), 1);
    assert_eq!(stats.failed(), 1);

    let live_link = store.get(&live).await.unwrap().unwrap();
    assert_eq!(live_link.status, LinkStatus::Active);
    assert!(live_link.error.is_none());
    assert!(live_link.last_check.unwrap() >= run_start);

    let dead_link = store.get(&dead).await.unwrap().unwrap();
    assert_eq!(dead_link.status, LinkStatus::Failed);
    let error = dead_link.error.unwrap();
    assert!(error.starts_with("failed after 2 attempts:"), "{error}");
    assert!(error.contains("HTTP 404"), "{error}");
    assert!(dead_link.last_check.unwrap() >= run_start);

    let snapshot = service.list_links().await.unwrap();
    assert_eq!(snapshot.active_count, 1);
    assert_eq!(store.count_by_status(LinkStatus::Failed).await.unwrap(), 1);
}

#[tokio::test]
async fn test_recovered_link_clears_previous_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let service = service_over(store.clone(), 1);
    let live = format!("{}/s/live", server.uri());
    service.add_links([&live]).await.unwrap();

    // First run: host is down.
    service.engine().run_once().await.unwrap();
    let first = store.get(&live).await.unwrap().unwrap();
    assert_eq!(first.status, LinkStatus::Failed);
    let first_check = first.last_check.unwrap();

    // Second run: host is back.
    mount_live_host(&server).await;
    service.engine().run_once().await.unwrap();
    let second = store.get(&live).await.unwrap().unwrap();
    assert_eq!(second.status, LinkStatus::Active);
    assert!(second.error.is_none());
    assert!(second.last_check.unwrap() >= first_check);
    assert_eq!(second.added_at, first.added_at);
}

#[tokio::test]
async fn test_links_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(&dir).await;
        let service = service_over(store, 1);
        service
            .add_links(["https://share.example/s/a", "https://share.example/s/b"])
            .await
            .unwrap();
    }

    let store = open_store(&dir).await;
    let links = store.list_all().await.unwrap();
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|link| link.status == LinkStatus::Pending));
}
