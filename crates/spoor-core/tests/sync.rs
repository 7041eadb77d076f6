use serde_json::json;
use spoor_core::auth::{AuthSession, AuthUser, MemorySessionStore, SessionPersistence, SupabaseAuthClient};
use spoor_core::config::RemoteConfig;
use spoor_core::db::{Database, LibSqlReportRepository, ReportRepository, SyncStore};
use spoor_core::models::ObservationType;
use spoor_core::remote::SupabaseRemote;
use spoor_core::sync::{SyncEngine, SyncError};
use spoor_core::{Report, ReportId, ReportMedia, SyncStatus};
use wiremock::matchers::{body_partial_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn signed_in_store() -> MemorySessionStore {
    let store = MemorySessionStore::default();
    store
        .save_session(&AuthSession {
            access_token: "user-jwt".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: i64::MAX / 2,
            user: AuthUser {
                id: "ranger-1".to_string(),
                email: None,
            },
        })
        .unwrap();
    store
}

fn loss_report(id: &str, device_timestamp: i64) -> Report {
    let mut report = Report::new("ranger-1");
    report.id = ReportId::from(id);
    report.device_timestamp = device_timestamp;
    report.observation_type = Some(ObservationType::Loss);
    report.loss_type = vec!["Crop".to_string()];
    report
}

async fn mount_accepting_tables(server: &MockServer) {
    for table in ["reports", "observations", "damages", "report_media"] {
        Mock::given(method("POST"))
            .and(path(format!("/rest/v1/{table}")))
            .respond_with(ResponseTemplate::new(201))
            .mount(server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path_regex(r"^/storage/v1/object/report-media/[^/]+/[^/]+\.jpg$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn queued_reports_reach_the_remote_and_failures_stay_queued() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/damages"))
        .and(body_partial_json(json!({ "report_id": "r-bad" })))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/reports"))
        .and(query_param("id", "eq.r-bad"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    mount_accepting_tables(&server).await;

    let db = Database::open_in_memory().await.unwrap();
    let repo = LibSqlReportRepository::new(db.connection());
    let good = loss_report("r-good", 1_000);
    let bad = loss_report("r-bad", 2_000);
    let photo = ReportMedia::from_bytes(good.id.clone(), "image/jpeg", b"jpeg").unwrap();
    repo.create_report(&good, std::slice::from_ref(&photo))
        .await
        .unwrap();
    repo.create_report(&bad, &[]).await.unwrap();

    let config = RemoteConfig::new(server.uri(), "anon-key").unwrap();
    let auth = SupabaseAuthClient::new(server.uri(), "anon-key", signed_in_store()).unwrap();
    let remote = SupabaseRemote::new(config, "user-jwt").unwrap();
    let engine = SyncEngine::new(LibSqlReportRepository::new(db.connection()), remote, auth);

    let summary = engine.run().await.unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.synced, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].report_id, bad.id);

    let stored_good = repo.get_report(&good.id).await.unwrap().unwrap();
    let stored_bad = repo.get_report(&bad.id).await.unwrap().unwrap();
    assert_eq!(stored_good.sync_status, SyncStatus::Synced);
    assert_eq!(stored_bad.sync_status, SyncStatus::Failed);
    let media = repo.list_media(&good.id).await.unwrap();
    assert_eq!(media[0].sync_status, SyncStatus::Synced);

    let pending = repo.list_pending().await.unwrap();
    assert_eq!(
        pending
            .iter()
            .map(|report| report.as_ref().unwrap().id.clone())
            .collect::<Vec<_>>(),
        vec![bad.id.clone()]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn run_without_session_leaves_queue_untouched() {
    let server = MockServer::start().await;
    let db = Database::open_in_memory().await.unwrap();
    let repo = LibSqlReportRepository::new(db.connection());
    let report = loss_report("r-1", 1_000);
    repo.create_report(&report, &[]).await.unwrap();

    let config = RemoteConfig::new(server.uri(), "anon-key").unwrap();
    let auth =
        SupabaseAuthClient::new(server.uri(), "anon-key", MemorySessionStore::default()).unwrap();
    let remote = SupabaseRemote::new(config, "user-jwt").unwrap();
    let engine = SyncEngine::new(LibSqlReportRepository::new(db.connection()), remote, auth);

    let report_result = engine.run_sync().await;
    assert!(!report_result.success);
    assert_eq!(report_result.count, 0);
    assert!(matches!(engine.run().await, Err(SyncError::NotAuthenticated)));

    let stored = repo.get_report(&report.id).await.unwrap().unwrap();
    assert_eq!(stored.sync_status, SyncStatus::Pending);
    assert!(server.received_requests().await.unwrap().is_empty());
}
