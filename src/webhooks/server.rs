//! Admission webhook server.
//!
//! Provides the HTTP endpoint Kubernetes calls for SlackMessage admission.
//!
//! To enable TLS:
//! 1. Deploy cert-manager for TLS certificates
//! 2. Create a ValidatingWebhookConfiguration pointing at `/validate-slackmessage`
//! 3. Mount the TLS certificate secret to the pod at /etc/webhook/certs/
//!
//! Without certificates the server falls back to plain HTTP, which is only
//! useful behind a TLS-terminating proxy or in local testing.
//!
//! Status codes and the admission decision are separate signals: a validation
//! error is answered with 500 *and* a complete denial review in the body.

use std::sync::Arc;

use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::WebhookConfig;
use crate::crd::SlackMessage;
use crate::health::HealthState;
use crate::webhooks::admission::AdmissionReviewRequest;
use crate::webhooks::validator::Validator;

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 9443;
/// Path of the SlackMessage validating webhook
pub const VALIDATE_PATH: &str = "/validate-slackmessage";

/// Shared state for webhook handlers
pub struct WebhookState {
    pub validator: Validator,
}

impl WebhookState {
    pub fn new(validator: Validator) -> Self {
        Self { validator }
    }
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(VALIDATE_PATH, post(validate_slackmessage))
        .with_state(state)
}

/// Validate a SlackMessage admission webhook handler
async fn validate_slackmessage(State(state): State<Arc<WebhookState>>, body: Bytes) -> Response {
    let review = match AdmissionReviewRequest::from_slice(&body) {
        Ok(review) => review,
        Err(e) => {
            warn!(error = %e, "Failed to parse admission review");
            return (StatusCode::BAD_REQUEST, "Failed to parse JSON").into_response();
        }
    };
    let request = review.request;

    let message: SlackMessage = match request.candidate() {
        Ok(message) => message,
        Err(e) => {
            warn!(uid = %request.uid, error = %e, "Invalid object in admission request");
            return (StatusCode::BAD_REQUEST, "Invalid object format").into_response();
        }
    };

    debug!(
        uid = %request.uid,
        dry_run = request.dry_run,
        resource = %request.resource,
        sub_resource = %request.sub_resource,
        "Processing admission request"
    );

    let uid = if request.uid.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        request.uid
    };

    // Dropping the handler future (client went away) cancels the validation.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let validator = &state.validator;
    match validator.validate_with_uid(&cancel, uid, message).await {
        Ok(review) => {
            info!(uid = %review.uid(), "Admission request allowed");
            (StatusCode::OK, Json(review)).into_response()
        }
        Err(rejection) => {
            error!(
                uid = %rejection.review().uid(),
                kind = %rejection.error().kind(),
                error = %rejection.error(),
                "Webhook validation failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(rejection.into_review()),
            )
                .into_response()
        }
    }
}

/// Errors that can occur when running the webhook server
#[derive(Debug)]
pub enum WebhookError {
    /// TLS configuration error
    TlsConfig(String),
    /// Server error
    Server(String),
}

impl std::fmt::Display for WebhookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookError::TlsConfig(msg) => write!(f, "TLS configuration error: {}", msg),
            WebhookError::Server(msg) => write!(f, "Webhook server error: {}", msg),
        }
    }
}

impl std::error::Error for WebhookError {}

/// Run the webhook server
///
/// Binds to `0.0.0.0:<webhook_port>`. TLS is used when both certificate files
/// exist. Readiness is flipped on once the listener is configured.
pub async fn run_webhook_server(
    validator: Validator,
    config: &WebhookConfig,
    health_state: Option<Arc<HealthState>>,
) -> Result<(), WebhookError> {
    use axum_server::tls_rustls::RustlsConfig;
    use std::net::SocketAddr;

    info!(
        port = config.webhook_port,
        path = VALIDATE_PATH,
        timeout = ?validator.timeout(),
        "Starting webhook server"
    );

    let state = Arc::new(WebhookState::new(validator));
    let app = create_webhook_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));

    if config.tls_available() {
        let tls = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
            .await
            .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

        info!(
            port = config.webhook_port,
            "Webhook server listening with TLS"
        );
        if let Some(state) = &health_state {
            state.set_ready(true).await;
        }

        axum_server::bind_rustls(addr, tls)
            .serve(app.into_make_service())
            .await
            .map_err(|e| WebhookError::Server(e.to_string()))?;
    } else {
        warn!(
            port = config.webhook_port,
            cert_path = %config.cert_path.display(),
            "Webhook certificates not found, serving plain HTTP"
        );
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| WebhookError::Server(e.to_string()))?;
        if let Some(state) = &health_state {
            state.set_ready(true).await;
        }

        axum::serve(listener, app)
            .await
            .map_err(|e| WebhookError::Server(e.to_string()))?;
    }

    Ok(())
}
