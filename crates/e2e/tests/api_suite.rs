use std::time::Duration;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use platform_e2e::config::HarnessConfig;
use platform_e2e::suites::plan_runner_config;
use platform_e2e::{
    run_plan, run_suite, Grade, Outcome, ReportFormat, RunnerConfig, SuiteKind, SuiteRunner,
};

const TOKEN: &str = "test-token";

#[derive(Clone, Copy)]
struct Backend {
    accept_login: bool,
    users_have_roles: bool,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            accept_login: true,
            users_have_roles: true,
        }
    }
}

fn authorized(headers: &HeaderMap) -> Result<(), StatusCode> {
    let expected = format!("Bearer {}", TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

fn router(backend: Backend) -> Router {
    Router::new()
        .route(
            "/",
            get(|| async { Html("<html><title>Microservices Management System</title></html>") }),
        )
        .route(
            "/auth/login",
            post(move |Json(body): Json<Value>| async move {
                if backend.accept_login && body["password"] == "admin123" {
                    Ok(Json(json!({ "token": TOKEN, "userId": 1, "name": "Admin User" })))
                } else {
                    Err(StatusCode::UNAUTHORIZED)
                }
            }),
        )
        .route(
            "/users",
            get(move |headers: HeaderMap| async move {
                authorized(&headers)?;
                let mut user = json!({ "id": 1, "email": "admin@example.com", "name": "Admin User" });
                if backend.users_have_roles {
                    user["role"] = json!("ADMIN");
                }
                Ok::<_, StatusCode>(Json(json!([user])))
            }),
        )
        .route(
            "/orders",
            get(|headers: HeaderMap| async move {
                authorized(&headers)?;
                Ok::<_, StatusCode>(Json(json!([
                    { "id": 12, "userId": 1, "product": "Laptop", "status": "CANCELLED" }
                ])))
            }),
        )
        .route(
            "/notifications/user/:id",
            get(|headers: HeaderMap, Path(id): Path<String>| async move {
                authorized(&headers)?;
                if id != "1" {
                    return Err(StatusCode::NOT_FOUND);
                }
                Ok::<_, StatusCode>(Json(json!([])))
            }),
        )
        .route(
            "/audit/events",
            get(|headers: HeaderMap| async move {
                authorized(&headers)?;
                Ok::<_, StatusCode>(Json(json!({
                    "content": [{
                        "id": 7,
                        "timestamp": "2024-01-01T00:00:00Z",
                        "eventType": "USER_LOGIN",
                        "serviceName": "user-service",
                        "action": "LOGIN",
                        "result": "SUCCESS"
                    }],
                    "totalElements": 1
                })))
            }),
        )
}

async fn spawn_backend(backend: Backend) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(backend)).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config(base_url: String) -> HarnessConfig {
    HarnessConfig {
        base_url,
        use_system_proxy: false,
        runner: RunnerConfig::immediate(),
        ..Default::default()
    }
}

#[tokio::test]
async fn api_suite_passes_against_healthy_backend() {
    let base_url = spawn_backend(Backend::default()).await;
    let runner = SuiteRunner::new(RunnerConfig::immediate());

    let report = run_suite(SuiteKind::Api, &config(base_url), &runner).await.unwrap();

    let failed: Vec<String> = report.results.not_passed().map(|r| r.diagnostic()).collect();
    assert!(failed.is_empty(), "unexpected failures: {:?}", failed);
    assert_eq!(report.verdict.total, 7);
    assert_eq!(report.verdict.grade, Grade::AllPass);
    assert!(report.success);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn missing_user_fields_fail_only_users_api() {
    let base_url = spawn_backend(Backend {
        users_have_roles: false,
        ..Default::default()
    })
    .await;
    let runner = SuiteRunner::new(RunnerConfig::immediate());

    let report = run_suite(SuiteKind::Api, &config(base_url), &runner).await.unwrap();

    let users = report.results.get("Users API").unwrap();
    assert_eq!(users.outcome, Outcome::Failed);
    assert!(users.error.as_deref().unwrap().contains("role"));
    assert_eq!(report.verdict.passed, 6);
    assert_eq!(report.verdict.grade, Grade::MostlyPass);
    // the api suite requires every unit to pass
    assert!(!report.success);
}

#[tokio::test]
async fn rejected_login_skips_authenticated_checks() {
    let base_url = spawn_backend(Backend {
        accept_login: false,
        ..Default::default()
    })
    .await;
    let runner = SuiteRunner::new(RunnerConfig::immediate());

    let report = run_suite(SuiteKind::Api, &config(base_url), &runner).await.unwrap();

    assert_eq!(report.results.outcome("Frontend Health"), Some(true));
    let login = report.results.get("Login API").unwrap();
    assert_eq!(login.outcome, Outcome::Failed);
    assert!(login.error.as_deref().unwrap().contains("401"));
    assert_eq!(report.results.count(Outcome::Skipped), 5);
    assert_eq!(report.verdict.total, 7);
    assert!(!report.success);
}

#[tokio::test]
async fn cancelled_plan_still_reports_the_running_suite() {
    let base_url = spawn_backend(Backend::default()).await;
    let output = tempfile::tempdir().unwrap();
    let config = HarnessConfig {
        runner: RunnerConfig {
            inter_unit_delay: Duration::from_millis(500),
            unit_timeout: None,
        },
        suite_delay: Duration::from_millis(10),
        output_dir: Some(output.path().to_path_buf()),
        ..config(base_url)
    };
    let outer = SuiteRunner::new(plan_runner_config(&config));
    let token = outer.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        token.cancel();
    });

    let kinds = [SuiteKind::Api, SuiteKind::Websocket];
    let report = run_plan(&kinds, config, ReportFormat::Json, &outer).await;

    let suites: Vec<_> = report.results.iter().collect();
    assert_eq!(suites.len(), 2);
    // the api suite wound down on its own instead of being dropped
    assert_eq!(suites[0].outcome, Outcome::Failed);
    assert_eq!(suites[0].error, None);
    assert_eq!(suites[1].outcome, Outcome::Skipped);

    let written = std::fs::read_to_string(output.path().join("api-results.json")).unwrap();
    let api: serde_json::Value = serde_json::from_str(&written).unwrap();
    let results = api["results"].as_array().unwrap();
    assert_eq!(results.len(), 7);
    assert_eq!(results[0]["outcome"], "passed");
    assert!(results[1..].iter().all(|r| r["outcome"] == "skipped"));
    assert!(!output.path().join("websocket-results.json").exists());
}
