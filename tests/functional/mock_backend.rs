//! Test backends and request helpers.
//!
//! The in-memory client covers the happy path. The backends here model what a
//! remote chat API can do wrong: refuse, lose a channel, or be slow.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use kargo_slack_webhook::webhooks::{
    AdmissionReview, VALIDATE_PATH, WebhookState, create_webhook_router,
};
use kargo_slack_webhook::{ChannelProvisioner, InMemoryChannelClient, ProvisionError, Validator};

/// Backend whose remote call always fails.
pub struct UnavailableBackend;

#[async_trait]
impl ChannelProvisioner for UnavailableBackend {
    async fn create_channel(&self, _name: &str, _private: bool) -> Result<String, ProvisionError> {
        Err(ProvisionError::Unavailable("connection reset".to_string()))
    }

    async fn channel_exists(&self, _id: &str) -> bool {
        false
    }
}

/// Backend that takes `delay` to answer any call.
pub struct SlowBackend {
    pub inner: InMemoryChannelClient,
    pub delay: Duration,
}

#[async_trait]
impl ChannelProvisioner for SlowBackend {
    async fn create_channel(&self, name: &str, private: bool) -> Result<String, ProvisionError> {
        tokio::time::sleep(self.delay).await;
        self.inner.create_channel(name, private).await
    }

    async fn channel_exists(&self, id: &str) -> bool {
        self.inner.channel_exists(id).await
    }
}

/// Webhook router over the given backend and budget.
pub fn webhook_app(channels: Arc<dyn ChannelProvisioner>, timeout: Duration) -> Router {
    let validator = Validator::new(channels).with_timeout(timeout);
    create_webhook_router(Arc::new(WebhookState::new(validator)))
}

/// A SlackMessage manifest as the API server would embed it.
pub fn slack_message(channel: &str, namespace: Option<&str>, subscriptions: Value) -> Value {
    let mut metadata = json!({ "name": "http-test" });
    if let Some(ns) = namespace {
        metadata["namespace"] = json!(ns);
    }
    json!({
        "apiVersion": "kargo.akuity.io/v1alpha1",
        "kind": "SlackMessage",
        "metadata": metadata,
        "spec": {
            "slackChannel": channel,
            "message": "Deployment {{.Pipeline.Name}} succeeded",
            "subscriptions": subscriptions
        }
    })
}

/// Wrap an object into an AdmissionReview request body.
pub fn review_request(uid: &str, object: Value) -> Value {
    json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": uid,
            "dryRun": false,
            "userInfo": { "username": "system:serviceaccount:kargo:kargo-controller" },
            "object": object,
            "resource": {
                "group": "kargo.akuity.io",
                "version": "v1alpha1",
                "resource": "slackmessages"
            },
            "subResource": ""
        }
    })
}

/// POST a raw body to the validate path.
pub async fn post_raw(app: Router, body: impl Into<Body>) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(VALIDATE_PATH)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

/// POST a review and decode the AdmissionReview answer.
pub async fn post_review(app: Router, review: Value) -> (StatusCode, AdmissionReview) {
    let body = serde_json::to_vec(&review).unwrap();
    let (status, body) = post_raw(app, body).await;
    let review = serde_json::from_slice(&body).unwrap_or_else(|e| {
        let text = String::from_utf8_lossy(&body);
        panic!("body is not an AdmissionReview ({e}): {text}")
    });
    (status, review)
}
