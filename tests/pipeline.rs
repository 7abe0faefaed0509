//! End-to-end runs against a mocked GitHub traffic API.

use repo_traffic::models::MergeOutcome;
use repo_traffic::{run_at, Config, GitHubClient, TrafficError};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OWNER: &str = "octo";
const REPO: &str = "demo";
const GENERATED_AT: &str = "2024-01-05 09:30:00";

fn scratch_dir(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut dir = std::env::temp_dir();
    dir.push(format!("repo_traffic_it_{tag}_{}_{nanos}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn config(server: &MockServer, dir: &Path) -> Config {
    Config {
        owner: OWNER.into(),
        repo: REPO.into(),
        token: "test-token".into(),
        api_base: format!("{}/repos", server.uri()),
        data_path: dir.join("traffic_data.csv"),
        output_path: dir.join("dashboard.html"),
    }
}

fn series(key: &str, days: &[(u32, u64, u64)]) -> Value {
    let items: Vec<Value> = days
        .iter()
        .map(|(day, count, uniques)| {
            json!({
                "timestamp": format!("2024-01-{day:02}T00:00:00Z"),
                "count": count,
                "uniques": uniques,
            })
        })
        .collect();
    let total: u64 = days.iter().map(|(_, count, _)| count).sum();
    let mut body = json!({ "count": total, "uniques": 0 });
    body[key] = Value::Array(items);
    body
}

async fn mount(server: &MockServer, endpoint: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/traffic/{endpoint}")))
        .and(header("authorization", "token test-token"))
        .and(header("accept", "application/vnd.github.v3+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_traffic(server: &MockServer, clones: Value, views: Value, referrers: Value) {
    mount(server, "clones", clones).await;
    mount(server, "views", views).await;
    mount(server, "popular/referrers", referrers).await;
}

#[tokio::test]
async fn first_run_outer_joins_series_and_writes_both_artifacts() {
    let server = MockServer::start().await;
    mount_traffic(
        &server,
        series("clones", &[(1, 5, 2), (2, 6, 3), (3, 7, 4)]),
        series("views", &[(2, 20, 8), (3, 21, 9), (4, 22, 10)]),
        json!([
            { "referrer": "github.com", "count": 12, "uniques": 4 },
            { "referrer": "news.ycombinator.com", "count": 3, "uniques": 3 }
        ]),
    )
    .await;
    let dir = scratch_dir("first");
    let config = config(&server, &dir);

    let summary = run_at(&config, GENERATED_AT).await.expect("run succeeds");
    assert_eq!(summary.outcome, MergeOutcome::Created { rows: 4 });
    assert_eq!(summary.total_rows, 4);
    assert_eq!(summary.referrers, 2);

    let csv = std::fs::read_to_string(&config.data_path).unwrap();
    assert_eq!(
        csv,
        "date,clones,clones_uniques,views,views_uniques\n\
         2024-01-01,5,2,,\n\
         2024-01-02,6,3,20,8\n\
         2024-01-03,7,4,21,9\n\
         2024-01-04,,,22,10\n"
    );

    let html = std::fs::read_to_string(&config.output_path).unwrap();
    assert!(html.contains(GENERATED_AT));
    assert!(html.contains("news.ycombinator.com"));
    assert!(html.find("github.com").unwrap() < html.find("news.ycombinator.com").unwrap());

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn later_run_appends_only_new_dates() {
    let server = MockServer::start().await;
    mount_traffic(
        &server,
        series("clones", &[(2, 60, 30), (3, 70, 40), (4, 8, 5)]),
        series("views", &[(2, 200, 80), (3, 210, 90), (4, 22, 10)]),
        json!([]),
    )
    .await;
    let dir = scratch_dir("append");
    let config = config(&server, &dir);
    let history = "date,clones,clones_uniques,views,views_uniques\n\
                   2024-01-01,5,2,19,7\n\
                   2024-01-02,6,3,20,8\n\
                   2024-01-03,7,4,21,9\n";
    std::fs::write(&config.data_path, history).unwrap();

    let summary = run_at(&config, GENERATED_AT).await.unwrap();
    assert_eq!(summary.outcome, MergeOutcome::Appended { rows: 1 });

    let csv = std::fs::read_to_string(&config.data_path).unwrap();
    assert_eq!(csv, format!("{history}2024-01-04,8,5,22,10\n"));

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn rerun_with_same_upstream_data_leaves_file_untouched() {
    let server = MockServer::start().await;
    mount_traffic(
        &server,
        series("clones", &[(1, 1, 1), (2, 2, 1)]),
        series("views", &[(1, 3, 2)]),
        json!([]),
    )
    .await;
    let dir = scratch_dir("idempotent");
    let config = config(&server, &dir);

    run_at(&config, GENERATED_AT).await.unwrap();
    let first = std::fs::read(&config.data_path).unwrap();

    let summary = run_at(&config, "2024-01-06 09:30:00").await.unwrap();
    assert_eq!(summary.outcome, MergeOutcome::Unchanged);
    assert_eq!(std::fs::read(&config.data_path).unwrap(), first);

    let html = std::fs::read_to_string(&config.output_path).unwrap();
    assert!(html.contains("2024-01-06 09:30:00"));

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn empty_upstream_reports_no_new_data() {
    let server = MockServer::start().await;
    mount_traffic(
        &server,
        json!({ "count": 0, "uniques": 0, "clones": [] }),
        json!({ "count": 0, "uniques": 0 }),
        json!([]),
    )
    .await;
    let dir = scratch_dir("empty");
    let config = config(&server, &dir);

    let summary = run_at(&config, GENERATED_AT).await.unwrap();
    assert_eq!(summary.outcome, MergeOutcome::Unchanged);
    assert_eq!(summary.total_rows, 0);
    assert!(!config.data_path.exists());
    assert!(config.output_path.exists());

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn upstream_failure_aborts_without_touching_files() {
    let server = MockServer::start().await;
    mount(&server, "clones", series("clones", &[(9, 1, 1)])).await;
    mount(&server, "views", series("views", &[(9, 1, 1)])).await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/traffic/popular/referrers")))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    let dir = scratch_dir("upstream");
    let config = config(&server, &dir);
    let history = "date,clones,clones_uniques,views,views_uniques\n2024-01-01,5,2,19,7\n";
    std::fs::write(&config.data_path, history).unwrap();

    let err = run_at(&config, GENERATED_AT).await.unwrap_err();
    match err {
        TrafficError::Upstream { status, endpoint } => {
            assert_eq!(status.as_u16(), 403);
            assert!(endpoint.ends_with("/traffic/popular/referrers"));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
    assert_eq!(std::fs::read_to_string(&config.data_path).unwrap(), history);
    assert!(!config.output_path.exists());

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn report_failure_leaves_history_unchanged() {
    let server = MockServer::start().await;
    mount_traffic(
        &server,
        series("clones", &[(4, 1, 1)]),
        series("views", &[]),
        json!([]),
    )
    .await;
    let dir = scratch_dir("report_blocked");
    let mut config = config(&server, &dir);
    config.output_path = dir.join("outdir");
    std::fs::create_dir_all(config.output_path.join("occupied")).unwrap();
    let history = "date,clones,clones_uniques,views,views_uniques\n2024-01-01,5,2,19,7\n";
    std::fs::write(&config.data_path, history).unwrap();

    let err = run_at(&config, GENERATED_AT).await.unwrap_err();
    assert!(matches!(err, TrafficError::Render { .. }), "got {err:?}");
    assert_eq!(std::fs::read_to_string(&config.data_path).unwrap(), history);

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn corrupt_history_aborts_instead_of_starting_fresh() {
    let server = MockServer::start().await;
    mount_traffic(
        &server,
        series("clones", &[(1, 1, 1)]),
        series("views", &[(1, 1, 1)]),
        json!([]),
    )
    .await;
    let dir = scratch_dir("corrupt");
    let config = config(&server, &dir);
    let garbage = "not,a,traffic,file\n";
    std::fs::write(&config.data_path, garbage).unwrap();

    let err = run_at(&config, GENERATED_AT).await.unwrap_err();
    assert!(matches!(err, TrafficError::Persistence { line: 1, .. }));
    assert_eq!(std::fs::read_to_string(&config.data_path).unwrap(), garbage);
    assert!(!config.output_path.exists());

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn client_decodes_each_endpoint() {
    let server = MockServer::start().await;
    mount_traffic(
        &server,
        series("clones", &[(1, 5, 2)]),
        series("views", &[(1, 9, 4), (2, 0, 0)]),
        json!([{ "referrer": "google.com", "count": 2, "uniques": 1 }]),
    )
    .await;

    let client = GitHubClient::with_base_url("test-token", &format!("{}/repos/", server.uri())).unwrap();
    let clones = client.fetch_clones(OWNER, REPO).await.unwrap();
    assert_eq!(clones.len(), 1);
    assert_eq!(clones[0].count, 5);

    let views = client.fetch_views(OWNER, REPO).await.unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[1].uniques, 0);

    let referrers = client.fetch_referrers(OWNER, REPO).await.unwrap();
    assert_eq!(referrers[0].referrer, "google.com");
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/traffic/clones")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let client = GitHubClient::with_base_url("test-token", &format!("{}/repos", server.uri())).unwrap();
    let err = client.fetch_clones(OWNER, REPO).await.unwrap_err();
    assert!(matches!(err, TrafficError::Decode { .. }));
}
