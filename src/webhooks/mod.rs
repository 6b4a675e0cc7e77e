//! Webhook module.
//!
//! Two independent webhook styles live here:
//! - `server`: the validating admission webhook for SlackMessage resources
//! - `receiver`: a plain receiver that logs and acknowledges any payload

pub mod admission;
mod error;
pub mod policies;
pub mod receiver;
mod server;
mod validator;

pub use admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, AdmissionReviewRequest};
pub use error::{FailureKind, Rejection, ValidationError};
pub use receiver::{RECEIVER_PATH, create_receiver_router, run_receiver_server};
pub use server::{
    VALIDATE_PATH, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError, WebhookState,
    create_webhook_router, run_webhook_server,
};
pub use validator::{DEFAULT_VALIDATION_TIMEOUT, Validator};
