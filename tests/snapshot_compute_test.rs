use axum::http::StatusCode;
use serde_json::json;
use splitbook::api;
use splitbook::config::Config;
use splitbook::db::init_db;
use splitbook::Repository;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let config = Config {
        port: 0,
        database_path: db_path,
        dispute_sla_hours: 72,
        default_currency: "TRY".to_string(),
    };

    let app = api::create_router(api::AppState::new(repo, config));
    TestApp {
        app,
        _temp: temp_dir,
    }
}

async fn request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

async fn seed_policy(app: &axum::Router) {
    let (status, _) = request(
        app,
        "POST",
        "/v1/policies",
        Some(json!({
            "name": "standard",
            "calcMethod": "PERCENTAGE",
            "commissionRateBp": 400,
            "currency": "TRY",
            "hunterBp": 3000,
            "consultantBp": 5000,
            "brokerBp": 1500,
            "systemBp": 500,
            "roundingRule": "ROUND_HALF_UP",
            "effectiveFrom": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

fn compute_body(pool: &str) -> serde_json::Value {
    json!({
        "poolAmountMinor": pool,
        "makerId": "maker-1",
        "beneficiaries": {
            "hunter": "hunter-1",
            "consultant": "consultant-1",
            "broker": "broker-1"
        }
    })
}

fn allocation_amount(body: &serde_json::Value, role: &str) -> String {
    body["allocations"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["role"] == role)
        .unwrap_or_else(|| panic!("missing {role} allocation"))["amountMinor"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_compute_splits_pool_with_residue_to_system() {
    let test_app = setup_test_app().await;
    seed_policy(&test_app.app).await;

    let (status, body) = request(
        &test_app.app,
        "POST",
        "/v1/deals/deal-1/snapshots",
        Some(compute_body("1000001")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dealId"], "deal-1");
    assert_eq!(body["version"], 1);
    assert_eq!(body["status"], "PENDING_APPROVAL");
    assert_eq!(body["poolAmountMinor"], "1000001");
    assert_eq!(body["currency"], "TRY");
    assert_eq!(body["reused"], false);

    assert_eq!(allocation_amount(&body, "HUNTER"), "300000");
    assert_eq!(allocation_amount(&body, "CONSULTANT"), "500000");
    assert_eq!(allocation_amount(&body, "BROKER"), "150000");
    assert_eq!(allocation_amount(&body, "SYSTEM"), "50001");

    // SYSTEM has no beneficiary; humans keep theirs.
    let allocations = body["allocations"].as_array().unwrap();
    let system = allocations.iter().find(|a| a["role"] == "SYSTEM").unwrap();
    assert!(system["userId"].is_null());
    let hunter = allocations.iter().find(|a| a["role"] == "HUNTER").unwrap();
    assert_eq!(hunter["userId"], "hunter-1");
}

#[tokio::test]
async fn test_recompute_identical_inputs_reuses_snapshot() {
    let test_app = setup_test_app().await;
    seed_policy(&test_app.app).await;

    let (_, first) = request(
        &test_app.app,
        "POST",
        "/v1/deals/deal-1/snapshots",
        Some(compute_body("500000")),
    )
    .await;
    let (status, second) = request(
        &test_app.app,
        "POST",
        "/v1/deals/deal-1/snapshots",
        Some(compute_body("500000")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["reused"], true);
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["version"], 1);
}

#[tokio::test]
async fn test_recompute_different_pool_mints_next_version() {
    let test_app = setup_test_app().await;
    seed_policy(&test_app.app).await;

    request(
        &test_app.app,
        "POST",
        "/v1/deals/deal-1/snapshots",
        Some(compute_body("500000")),
    )
    .await;
    let (status, second) = request(
        &test_app.app,
        "POST",
        "/v1/deals/deal-1/snapshots",
        Some(compute_body("600000")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["reused"], false);
    assert_eq!(second["version"], 2);
}

#[tokio::test]
async fn test_compute_without_policy_conflicts() {
    let test_app = setup_test_app().await;

    let (status, body) = request(
        &test_app.app,
        "POST",
        "/v1/deals/deal-1/snapshots",
        Some(compute_body("500000")),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "NO_ACTIVE_POLICY");
}

#[tokio::test]
async fn test_compute_rejects_non_positive_pool() {
    let test_app = setup_test_app().await;
    seed_policy(&test_app.app).await;

    let (status, _) = request(
        &test_app.app,
        "POST",
        "/v1/deals/deal-1/snapshots",
        Some(compute_body("0")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
        &test_app.app,
        "POST",
        "/v1/deals/deal-1/snapshots",
        Some(compute_body("-100")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compute_uses_default_currency_when_omitted() {
    let test_app = setup_test_app().await;
    seed_policy(&test_app.app).await;

    let (_, body) = request(
        &test_app.app,
        "POST",
        "/v1/deals/deal-1/snapshots",
        Some(compute_body("500000")),
    )
    .await;
    assert_eq!(body["currency"], "TRY");
}

#[tokio::test]
async fn test_deal_detail_lists_versions_newest_first() {
    let test_app = setup_test_app().await;
    seed_policy(&test_app.app).await;

    request(
        &test_app.app,
        "POST",
        "/v1/deals/deal-1/snapshots",
        Some(compute_body("500000")),
    )
    .await;
    request(
        &test_app.app,
        "POST",
        "/v1/deals/deal-1/snapshots",
        Some(compute_body("600000")),
    )
    .await;

    let (status, body) = request(&test_app.app, "GET", "/v1/deals/deal-1/commission", None).await;
    assert_eq!(status, StatusCode::OK);
    let snapshots = body["snapshots"].as_array().unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0]["version"], 2);
    assert_eq!(snapshots[1]["version"], 1);
    assert_eq!(snapshots[0]["allocations"].as_array().unwrap().len(), 4);
    assert!(body["ledger"].as_array().unwrap().is_empty());
    assert!(body["payoutLinks"].as_array().unwrap().is_empty());
}
