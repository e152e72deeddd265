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

/// Policy + approved snapshot over `pool` for `deal`; returns snapshot id.
async fn approved_snapshot(app: &axum::Router, deal: &str, pool: &str) -> i64 {
    request(
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

    let (_, body) = request(
        app,
        "POST",
        &format!("/v1/deals/{deal}/snapshots"),
        Some(json!({
            "poolAmountMinor": pool,
            "makerId": "maker-1",
            "beneficiaries": {
                "hunter": "hunter-1",
                "consultant": "consultant-1",
                "broker": "broker-1"
            }
        })),
    )
    .await;
    let snapshot_id = body["id"].as_i64().unwrap();

    let (status, _) = request(
        app,
        "POST",
        &format!("/v1/snapshots/{snapshot_id}/approve"),
        Some(json!({"approverId": "broker-chief"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    snapshot_id
}

fn allocation_field(detail: &serde_json::Value, role: &str, field: &str) -> String {
    detail["snapshots"][0]["allocations"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["role"] == role)
        .unwrap()[field]
        .as_str()
        .unwrap()
        .to_string()
}

fn allocation_id(detail: &serde_json::Value, role: &str) -> i64 {
    detail["snapshots"][0]["allocations"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["role"] == role)
        .unwrap()["id"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn test_full_reversal_offsets_everything() {
    let test_app = setup_test_app().await;
    let snapshot_id = approved_snapshot(&test_app.app, "deal-1", "1000000").await;

    let (status, body) = request(
        &test_app.app,
        "POST",
        &format!("/v1/snapshots/{snapshot_id}/reverse"),
        Some(json!({"actorId": "broker-chief", "reason": "deal fell through"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "REVERSED");
    // One REVERSAL debit per allocation with outstanding balance.
    assert_eq!(body["entries"].as_array().unwrap().len(), 4);

    let (_, detail) = request(&test_app.app, "GET", "/v1/deals/deal-1/commission", None).await;
    assert_eq!(allocation_field(&detail, "HUNTER", "reversedMinor"), "300000");
    assert_eq!(
        allocation_field(&detail, "CONSULTANT", "reversedMinor"),
        "500000"
    );
    assert_eq!(allocation_field(&detail, "BROKER", "reversedMinor"), "150000");
    assert_eq!(allocation_field(&detail, "SYSTEM", "reversedMinor"), "50000");

    // Ledger: 1 allocation credit + 4 reversal debits summing to the pool.
    let ledger = detail["ledger"].as_array().unwrap();
    let reversal_total: i64 = ledger
        .iter()
        .filter(|e| e["entryType"] == "REVERSAL")
        .map(|e| e["amountMinor"].as_str().unwrap().parse::<i64>().unwrap())
        .sum();
    assert_eq!(reversal_total, 1_000_000);
}

#[tokio::test]
async fn test_partial_reversal_distributes_proportionally() {
    let test_app = setup_test_app().await;
    // Pool 1_000_001: hunter 300_000, consultant 500_000, broker 150_000,
    // system 50_001 (rounding residue).
    let snapshot_id = approved_snapshot(&test_app.app, "deal-1", "1000001").await;

    // Pay the hunter out completely, then reverse 50_000: the reversal must
    // spread over the remaining outstanding of 700_001.
    let (_, detail) = request(&test_app.app, "GET", "/v1/deals/deal-1/commission", None).await;
    let hunter = allocation_id(&detail, "HUNTER");
    let (status, _) = request(
        &test_app.app,
        "POST",
        "/v1/payouts",
        Some(json!({
            "paidAt": 1700000000000i64,
            "method": "BANK_TRANSFER",
            "allocations": [{"allocationId": hunter, "amountMinor": "300000"}],
            "createdBy": "accounting-1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &test_app.app,
        "POST",
        &format!("/v1/snapshots/{snapshot_id}/reverse"),
        Some(json!({
            "actorId": "broker-chief",
            "reason": "attribution corrected",
            "amountMinor": "50000"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PARTIALLY_REVERSED");

    let (_, detail) = request(&test_app.app, "GET", "/v1/deals/deal-1/commission", None).await;
    assert_eq!(allocation_field(&detail, "HUNTER", "reversedMinor"), "0");
    assert_eq!(
        allocation_field(&detail, "CONSULTANT", "reversedMinor"),
        "35714"
    );
    assert_eq!(allocation_field(&detail, "BROKER", "reversedMinor"), "10714");
    // Floor residue lands on SYSTEM.
    assert_eq!(allocation_field(&detail, "SYSTEM", "reversedMinor"), "3572");
}

#[tokio::test]
async fn test_overreversal_is_rejected_untouched() {
    let test_app = setup_test_app().await;
    let snapshot_id = approved_snapshot(&test_app.app, "deal-1", "1000000").await;

    let (status, body) = request(
        &test_app.app,
        "POST",
        &format!("/v1/snapshots/{snapshot_id}/reverse"),
        Some(json!({
            "actorId": "broker-chief",
            "reason": "too much",
            "amountMinor": "1000001"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "OVERREVERSAL");

    let (_, detail) = request(&test_app.app, "GET", "/v1/deals/deal-1/commission", None).await;
    assert_eq!(detail["snapshots"][0]["status"], "APPROVED");
    assert_eq!(allocation_field(&detail, "HUNTER", "reversedMinor"), "0");
}

#[tokio::test]
async fn test_sequential_partial_reversals_conserve_totals() {
    let test_app = setup_test_app().await;
    let snapshot_id = approved_snapshot(&test_app.app, "deal-1", "1000000").await;

    for amount in ["400000", "350000", "250000"] {
        let (status, _) = request(
            &test_app.app,
            "POST",
            &format!("/v1/snapshots/{snapshot_id}/reverse"),
            Some(json!({
                "actorId": "broker-chief",
                "reason": "staged unwind",
                "amountMinor": amount
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // 400k + 350k + 250k == the whole pool: fully reversed, exactly.
    let (_, detail) = request(&test_app.app, "GET", "/v1/deals/deal-1/commission", None).await;
    assert_eq!(detail["snapshots"][0]["status"], "REVERSED");

    let reversed_total: i64 = detail["snapshots"][0]["allocations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["reversedMinor"].as_str().unwrap().parse::<i64>().unwrap())
        .sum();
    assert_eq!(reversed_total, 1_000_000);

    // Nothing further can be reversed.
    let (status, body) = request(
        &test_app.app,
        "POST",
        &format!("/v1/snapshots/{snapshot_id}/reverse"),
        Some(json!({
            "actorId": "broker-chief",
            "reason": "again",
            "amountMinor": "1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "INVALID_STATE");
}

#[tokio::test]
async fn test_reverse_pending_snapshot_is_invalid() {
    let test_app = setup_test_app().await;

    request(
        &test_app.app,
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
    let (_, body) = request(
        &test_app.app,
        "POST",
        "/v1/deals/deal-1/snapshots",
        Some(json!({
            "poolAmountMinor": "1000000",
            "makerId": "maker-1",
            "beneficiaries": {"hunter": "hunter-1"}
        })),
    )
    .await;
    let snapshot_id = body["id"].as_i64().unwrap();

    let (status, error) = request(
        &test_app.app,
        "POST",
        &format!("/v1/snapshots/{snapshot_id}/reverse"),
        Some(json!({"actorId": "broker-chief", "reason": "early"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["kind"], "INVALID_STATE");
}

#[tokio::test]
async fn test_reverse_rejects_non_positive_amount_and_empty_reason() {
    let test_app = setup_test_app().await;
    let snapshot_id = approved_snapshot(&test_app.app, "deal-1", "1000000").await;

    let (status, _) = request(
        &test_app.app,
        "POST",
        &format!("/v1/snapshots/{snapshot_id}/reverse"),
        Some(json!({
            "actorId": "broker-chief",
            "reason": "zero",
            "amountMinor": "0"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = request(
        &test_app.app,
        "POST",
        &format!("/v1/snapshots/{snapshot_id}/reverse"),
        Some(json!({"actorId": "broker-chief", "reason": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
