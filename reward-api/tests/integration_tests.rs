//! Integration tests for the reward API
//!
//! Runs the full router against the in-memory store, the mock metrics
//! provider and the mock ledger.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use reward_api::{create_router, ApiConfig, AppState, AuthConfig};
use reward_core::EngagementMetrics;
use reward_engine::{MockLedger, MockMetricsProvider};
use reward_store::RewardDatabase;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const PASSWORD: &str = "test-admin";
const TREASURY: &str = "0xa11ce";
const HOT_VIDEO: &str = "7300000000000000001";
const COLD_VIDEO: &str = "7300000000000000002";

struct Harness {
    server: TestServer,
    ledger: Arc<MockLedger>,
}

fn admin() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-admin-password"),
        HeaderValue::from_static(PASSWORD),
    )
}

fn video_url(id: &str) -> String {
    format!("https://www.tiktok.com/@dancer/video/{}", id)
}

async fn create_test_server() -> Harness {
    let database = RewardDatabase::memory();
    database.init_schema().await.unwrap();

    let provider = MockMetricsProvider::new()
        .with_video(HOT_VIDEO, EngagementMetrics::new(5000, 400, 20, 3))
        .with_video(COLD_VIDEO, EngagementMetrics::new(10, 1, 0, 0));
    let ledger = Arc::new(MockLedger::new(TREASURY));

    let state = AppState::new(
        ApiConfig::default(),
        AuthConfig::with_password(PASSWORD),
        database,
        Arc::new(provider),
        ledger.clone(),
    );

    Harness {
        server: TestServer::new(create_router(Arc::new(state))).unwrap(),
        ledger,
    }
}

async fn register_session(server: &TestServer) -> String {
    let (name, value) = admin();
    let response = server
        .post("/auth/sessions")
        .add_header(name, value)
        .json(&json!({ "tiktok_open_id": "open-1", "tiktok_username": "dancer", "access_token": "tok" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["sessionId"].as_str().unwrap().to_string()
}

async fn submit(server: &TestServer, session_id: &str, video: &str, wallet: &str) -> Value {
    let response = server
        .post("/submissions")
        .json(&json!({ "sessionId": session_id, "videoUrl": video_url(video), "walletAddress": wallet }))
        .await;
    response.assert_status_ok();
    response.json()
}

// ============ Health ============

#[tokio::test]
async fn test_health_check() {
    let h = create_test_server().await;

    let response = h.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["chain_id"], "SN_MOCK");
}

// ============ Auth ============

#[tokio::test]
async fn test_admin_routes_require_password() {
    let h = create_test_server().await;

    for path in ["/campaigns", "/submissions", "/submissions/stats", "/admin/payout/balance"] {
        let response = h.server.get(path).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"], "Unauthorized");
    }

    let response = h
        .server
        .get("/campaigns")
        .add_header(
            HeaderName::from_static("x-admin-password"),
            HeaderValue::from_static("wrong"),
        )
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_lifecycle() {
    let h = create_test_server().await;
    let session_id = register_session(&h.server).await;

    let response = h.server.get(&format!("/auth/session/{}", session_id)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user"]["openId"], "open-1");
    assert_eq!(body["user"]["username"], "dancer");

    let response = h.server.delete(&format!("/auth/session/{}", session_id)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);

    let response = h.server.get(&format!("/auth/session/{}", session_id)).await;
    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["error"], "Session not found");
}

// ============ Campaigns ============

#[tokio::test]
async fn test_campaign_crud() {
    let h = create_test_server().await;
    let (name, value) = admin();

    let response = h.server.get("/campaigns/active").await;
    response.assert_status_ok();
    let seeded: Value = response.json();
    assert_eq!(seeded["name"], "Campaign TikTok #1");

    let response = h
        .server
        .post("/campaigns")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "name": "Summer", "reward_amount": "2.5", "min_views": 100 }))
        .await;
    response.assert_status_ok();
    let created: Value = response.json();
    assert_eq!(created["max_winners"], 100);
    let id = created["id"].as_u64().unwrap();

    let response = h
        .server
        .post("/campaigns")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "name": "No reward" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Name and reward amount required");

    let response = h
        .server
        .put(&format!("/campaigns/{}", id))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "is_active": false }))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["is_active"], false);
    assert_eq!(updated["name"], "Summer");

    let response = h
        .server
        .delete(&format!("/campaigns/{}", id))
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();

    let response = h
        .server
        .delete(&format!("/campaigns/{}", id))
        .add_header(name, value)
        .await;
    response.assert_status_not_found();
}

// ============ Submissions ============

#[tokio::test]
async fn test_submission_intake() {
    let h = create_test_server().await;
    let session_id = register_session(&h.server).await;

    let hot = submit(&h.server, &session_id, HOT_VIDEO, "0xabc").await;
    assert_eq!(hot["eligible"], true);
    assert_eq!(hot["submission"]["status"], "eligible");
    assert_eq!(
        hot["message"],
        "Congratulations! Your video is eligible for 10 STRK."
    );

    let cold = submit(&h.server, &session_id, COLD_VIDEO, "0xdef").await;
    assert_eq!(cold["eligible"], false);
    assert_eq!(cold["submission"]["status"], "rejected");
    assert_eq!(
        cold["message"],
        "Your video does not meet the criteria. Required: 1000 views, 50 likes."
    );

    // Duplicate content
    let response = h
        .server
        .post("/submissions")
        .json(&json!({ "sessionId": session_id, "videoUrl": video_url(HOT_VIDEO), "walletAddress": "0x1" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "This video has already been submitted");

    let (name, value) = admin();
    let response = h.server.get("/submissions/stats").add_header(name, value).await;
    response.assert_status_ok();
    let stats: Value = response.json();
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["eligible"], 1);
    assert_eq!(stats["rejected"], 1);
}

#[tokio::test]
async fn test_submission_rejections() {
    let h = create_test_server().await;
    let session_id = register_session(&h.server).await;

    let cases = [
        (
            json!({ "sessionId": session_id, "videoUrl": video_url(HOT_VIDEO) }),
            StatusCode::BAD_REQUEST,
            "Session ID, video URL, and wallet address required",
        ),
        (
            json!({ "sessionId": session_id, "videoUrl": video_url(HOT_VIDEO), "walletAddress": "abc" }),
            StatusCode::BAD_REQUEST,
            "Invalid Starknet wallet address",
        ),
        (
            json!({ "sessionId": "nope", "videoUrl": video_url(HOT_VIDEO), "walletAddress": "0xabc" }),
            StatusCode::UNAUTHORIZED,
            "Invalid session",
        ),
        (
            json!({ "sessionId": session_id, "videoUrl": video_url(HOT_VIDEO), "walletAddress": "0xabc", "campaignId": 99 }),
            StatusCode::BAD_REQUEST,
            "Campaign not found or not active",
        ),
    ];

    for (payload, status, message) in cases {
        let response = h.server.post("/submissions").json(&payload).await;
        response.assert_status(status);
        let body: Value = response.json();
        assert_eq!(body["error"], message);
    }

    let response = h
        .server
        .post("/submissions")
        .json(&json!({ "sessionId": session_id, "videoUrl": video_url("7399999999999999999"), "walletAddress": "0xabc" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_overrides() {
    let h = create_test_server().await;
    let session_id = register_session(&h.server).await;
    let hot = submit(&h.server, &session_id, HOT_VIDEO, "0xabc").await;
    let id = hot["submission"]["id"].as_u64().unwrap();
    let (name, value) = admin();

    let response = h
        .server
        .patch(&format!("/submissions/{}", id))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "status": "winner" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "winner");

    let response = h
        .server
        .patch(&format!("/submissions/{}", id))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "status": "paid" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = h
        .server
        .patch(&format!("/submissions/{}", id))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "status": "shipped" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = h
        .server
        .post("/submissions/batch-status")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "ids": [id, 999], "status": "eligible" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["updated"], 1);
    assert_eq!(body["skipped"], json!([999]));

    let response = h
        .server
        .post("/submissions/batch-status")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "ids": [], "status": "eligible" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "IDs array required");

    let response = h
        .server
        .get("/submissions?status=eligible")
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    let rows: Value = response.json();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["campaign_name"], "Campaign TikTok #1");
}

// ============ Payouts ============

#[tokio::test]
async fn test_payout_flow() {
    let h = create_test_server().await;
    let session_id = register_session(&h.server).await;
    let hot = submit(&h.server, &session_id, HOT_VIDEO, "0xabc").await;
    let id = hot["submission"]["id"].as_u64().unwrap();
    let (name, value) = admin();

    let response = h
        .server
        .post("/admin/payout/simulate")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "submissionIds": [id] }))
        .await;
    response.assert_status_ok();
    let preview: Value = response.json();
    assert_eq!(preview["count"], 1);
    assert_eq!(preview["totalAmount"], "10.00");

    let response = h
        .server
        .post("/admin/payout")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "submission_ids": [id] }))
        .await;
    response.assert_status_ok();
    let report: Value = response.json();
    assert_eq!(report["message"], "Payout complete: 1 successful, 0 failed");
    assert_eq!(report["results"][0]["success"], true);
    assert!(report["results"][0]["tx_reference"].is_string());
    assert_eq!(h.ledger.balance_of("0xabc").await, 10 * 10u128.pow(18));

    // Already paid
    let response = h
        .server
        .post("/admin/payout")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "submission_ids": [id] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "No eligible submissions found");

    let response = h
        .server
        .post("/admin/payout")
        .add_header(name.clone(), value.clone())
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Submission IDs array required");

    let response = h.server.get("/admin/payout/balance").add_header(name, value).await;
    response.assert_status_ok();
    let balance: Value = response.json();
    assert_eq!(balance["address"], TREASURY);
    assert_eq!(balance["balance"], "999990.0000");
}

#[tokio::test]
async fn test_payout_job() {
    let h = create_test_server().await;
    let session_id = register_session(&h.server).await;
    let hot = submit(&h.server, &session_id, HOT_VIDEO, "0xabc").await;
    let id = hot["submission"]["id"].as_u64().unwrap();
    let (name, value) = admin();

    let response = h
        .server
        .post("/admin/payout/jobs")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "submissionIds": [id] }))
        .await;
    response.assert_status(StatusCode::ACCEPTED);
    let started: Value = response.json();
    let job_id = started["job_id"].as_str().unwrap().to_string();

    let mut job = Value::Null;
    for _ in 0..50 {
        let response = h
            .server
            .get(&format!("/admin/payout/jobs/{}", job_id))
            .add_header(name.clone(), value.clone())
            .await;
        response.assert_status_ok();
        job = response.json();
        if job["status"] != "running" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(job["status"], "completed");
    assert_eq!(job["report"]["successful"], 1);

    let response = h
        .server
        .get("/admin/payout/jobs/unknown")
        .add_header(name, value)
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_reconcile_repairs_lost_transfer() {
    let h = create_test_server().await;
    let session_id = register_session(&h.server).await;
    let hot = submit(&h.server, &session_id, HOT_VIDEO, "0xabc").await;
    let id = hot["submission"]["id"].as_u64().unwrap();
    let (name, value) = admin();

    let tx = h.ledger.inject_transfer("0xabc", 10 * 10u128.pow(18)).await;

    let response = h
        .server
        .post("/admin/payout/reconcile")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "repair": true }))
        .await;
    response.assert_status_ok();
    let report: Value = response.json();
    assert_eq!(report["checked"], 1);
    assert_eq!(report["matches"][0]["submission_id"], id);
    assert_eq!(report["matches"][0]["tx_reference"], tx);
    assert_eq!(report["matches"][0]["source"], "chain_history");
    assert_eq!(report["matches"][0]["repaired"], true);

    // The repaired row is no longer payable
    let response = h
        .server
        .post("/admin/payout")
        .add_header(name, value)
        .json(&json!({ "submission_ids": [id] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
