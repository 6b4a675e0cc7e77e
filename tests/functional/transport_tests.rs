//! Transport behaviour: decoding, status mapping, routing.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::mock_backend::{post_raw, post_review, review_request, slack_message, webhook_app};
use kargo_slack_webhook::health::{HealthState, create_router};
use kargo_slack_webhook::webhooks::{VALIDATE_PATH, WebhookState, create_webhook_router};
use kargo_slack_webhook::{InMemoryChannelClient, Validator};

fn app() -> axum::Router {
    webhook_app(
        Arc::new(InMemoryChannelClient::new()),
        Duration::from_secs(30),
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (status, body) = post_raw(app(), "{\"apiVersion\": ").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(String::from_utf8_lossy(&body), "Failed to parse JSON");
}

#[tokio::test]
async fn test_non_object_payload_is_bad_request() {
    let client = Arc::new(InMemoryChannelClient::new());
    let app = webhook_app(client.clone(), Duration::from_secs(30));

    let review = review_request("uid", json!(["not", "a", "mapping"]));
    let (status, body) = post_raw(app, serde_json::to_vec(&review).unwrap()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(String::from_utf8_lossy(&body), "Invalid object format");
    assert!(client.is_empty().await);
}

#[tokio::test]
async fn test_missing_object_is_bad_request() {
    let body = serde_json::to_vec(&json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": { "uid": "uid-empty" }
    }))
    .unwrap();

    let (status, _) = post_raw(app(), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mistyped_object_is_bad_request() {
    let object = json!({
        "metadata": { "name": "typo", "namespace": "kargo" },
        "spec": { "slackChannel": 42 }
    });
    let body = serde_json::to_vec(&review_request("uid", object)).unwrap();

    let (status, _) = post_raw(app(), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_object_without_spec_is_denied_not_rejected() {
    let client = Arc::new(InMemoryChannelClient::new());
    let app = webhook_app(client.clone(), Duration::from_secs(30));

    let object = json!({ "metadata": { "namespace": "kargo" } });
    let (status, review) = post_review(app, review_request("uid-sparse", object)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!review.is_allowed());
    assert_eq!(review.uid(), "uid-sparse");
    let reason = review.reason().unwrap();
    assert!(reason.contains("slackChannel is required"));
    assert!(client.is_empty().await);
}

#[tokio::test]
async fn test_empty_object_is_denied_not_rejected() {
    let (status, review) = post_review(app(), review_request("uid-bare", json!({}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let reason = review.reason().unwrap();
    assert!(reason.contains("slackChannel is required"));
}

#[tokio::test]
async fn test_null_subscriptions_treated_as_empty() {
    let object = json!({
        "metadata": { "name": "nulls", "namespace": "kargo" },
        "spec": { "slackChannel": "alerts", "subscriptions": null }
    });
    let (status, review) = post_review(app(), review_request("uid-null", object)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(review.is_allowed());
}

#[tokio::test]
async fn test_empty_request_uid_gets_generated() {
    let object = slack_message("alerts", Some("kargo"), json!([]));
    let (status, review) = post_review(app(), review_request("", object)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!review.uid().is_empty());
}

#[tokio::test]
async fn test_response_envelope_shape() {
    let object = slack_message("", Some("kargo"), json!([]));
    let body = serde_json::to_vec(&review_request("uid-shape", object)).unwrap();
    let (_, body) = post_raw(app(), body).await;
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(value["apiVersion"], "admission.k8s.io/v1");
    assert_eq!(value["kind"], "AdmissionReview");
    assert_eq!(value["response"]["uid"], "uid-shape");
    assert_eq!(value["response"]["allowed"], false);
    assert_eq!(value["response"]["result"]["status"], "Failure");
    assert!(value["response"].get("patch").is_none());
}

#[tokio::test]
async fn test_get_is_method_not_allowed() {
    let response = app().oneshot(get(VALIDATE_PATH)).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_liveness_probe() {
    let router = create_router(Arc::new(HealthState::new()));
    let response = router.oneshot(get("/healthz")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_readiness_follows_state() {
    let state = Arc::new(HealthState::new());

    let router = create_router(state.clone());
    let response = router.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    state.set_ready(true).await;
    let response = create_router(state).oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_reflect_admissions() {
    let state = Arc::new(HealthState::new());
    let client = Arc::new(InMemoryChannelClient::new());
    let validator = Validator::new(client).with_health_state(state.clone());
    let app = create_webhook_router(Arc::new(WebhookState::new(validator)));

    let allowed = slack_message("alerts", Some("kargo"), json!([]));
    post_review(app.clone(), review_request("m1", allowed)).await;
    let denied = slack_message("", Some("kargo"), json!([]));
    post_review(app, review_request("m2", denied)).await;

    let response = create_router(state).oneshot(get("/metrics")).await.unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8_lossy(&body);

    for line in [
        "slackwebhook_admission_requests_total{decision=\"allowed\"} 1",
        "slackwebhook_admission_requests_total{decision=\"denied\"} 1",
        "slackwebhook_admission_denials_total{kind=\"missing_field\"} 1",
        "slackwebhook_channels_provisioned_total 1",
    ] {
        assert!(text.contains(line), "missing {line} in:\n{text}");
    }
}
