use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::scoring::router::score_router;

async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn enroll_then_fetch_roundtrip() {
    let harness = harness();
    let app = score_router(harness.service.clone());

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/score/enroll",
            json!({
                "user_id": "amina",
                "seed": { "payment_history": 10, "completion": 5, "time_reliability": 0,
                          "deposit": 0, "diversity_social": 0, "engagement": 0 }
            }),
        ))
        .await
        .expect("request dispatches");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/score/amina")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request dispatches");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total_score"], 15);
    assert_eq!(payload["tier"], "restricted");
}

#[tokio::test]
async fn unattributable_adjustment_is_unprocessable() {
    let harness = harness();
    trusted_member(&harness, "amina");
    let app = score_router(harness.service.clone());

    // A predefined apply for a trigger with no table entry fails closed.
    let response = app
        .oneshot(post_json(
            "/api/v1/score/adjustments",
            json!({ "user_id": "amina", "trigger": "manual" }),
        ))
        .await
        .expect("request dispatches");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn capacity_rejection_reports_the_remainder() {
    let harness = harness();
    trusted_member(&harness, "voucher");
    seed_member(&harness, "vouchee", seed(20, 10, 0, 0, 0, 0), 200, 0);
    let app = score_router(harness.service.clone());

    let response = app
        .oneshot(post_json(
            "/api/v1/vouches",
            json!({
                "voucher_id": "voucher",
                "vouchee_id": "vouchee",
                "points": 9
            }),
        ))
        .await
        .expect("request dispatches");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["available"], 5);
    assert_eq!(payload["max"], 5);
}

#[tokio::test]
async fn unknown_user_maps_to_not_found() {
    let harness = harness();
    let app = score_router(harness.service.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/score/ghost")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request dispatches");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
