//! Error types for SlackMessage validation.
//!
//! Every error here is decision-relevant: it ends up as a denial in the
//! AdmissionReview rather than escaping the transport layer.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::client::ProvisionError;
use crate::webhooks::admission::AdmissionReview;

/// Why a SlackMessage was not admitted.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Required field empty or missing
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("subscription stage cannot be empty")]
    EmptySubscriptionStage,

    #[error("subscription must have at least one event")]
    EmptySubscriptionEvents,

    /// Channel backend refused to create the channel
    #[error("failed to create Slack channel: {0}")]
    Provisioning(#[from] ProvisionError),

    /// Channel was created but the backend does not know it
    #[error("Slack channel {0} not found after creation")]
    ChannelNotFound(String),

    #[error("validation did not complete within {0:?}")]
    Timeout(Duration),

    #[error("validation cancelled by caller")]
    Cancelled,

    /// Check task panicked or was aborted by the runtime
    #[error("validation check aborted: {0}")]
    CheckAborted(String),
}

impl ValidationError {
    /// Classify the error for metrics and logging.
    pub fn kind(&self) -> FailureKind {
        match self {
            ValidationError::MissingField(_) => FailureKind::MissingField,
            ValidationError::EmptySubscriptionStage | ValidationError::EmptySubscriptionEvents => {
                FailureKind::InvalidSubscription
            }
            ValidationError::Provisioning(_) | ValidationError::ChannelNotFound(_) => {
                FailureKind::Provisioning
            }
            ValidationError::Timeout(_) => FailureKind::Timeout,
            ValidationError::Cancelled => FailureKind::Cancelled,
            ValidationError::CheckAborted(_) => FailureKind::Aborted,
        }
    }

    /// True when the check never produced a result (deadline or caller gone).
    pub fn is_deadline(&self) -> bool {
        matches!(
            self,
            ValidationError::Timeout(_) | ValidationError::Cancelled
        )
    }
}

/// Coarse failure classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    MissingField,
    InvalidSubscription,
    Provisioning,
    Timeout,
    Cancelled,
    Aborted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingField => "missing_field",
            FailureKind::InvalidSubscription => "invalid_subscription",
            FailureKind::Provisioning => "provisioning",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Aborted => "aborted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A denial: the fully formed review plus the error that caused it.
///
/// The transport still sends `review` to the caller, so the denial reason is
/// delivered even though validation returned an error.
#[derive(Error, Debug)]
#[error("admission denied: {source}")]
pub struct Rejection {
    review: AdmissionReview,
    source: ValidationError,
}

impl Rejection {
    pub fn new(review: AdmissionReview, source: ValidationError) -> Self {
        Self { review, source }
    }

    pub fn review(&self) -> &AdmissionReview {
        &self.review
    }

    pub fn into_review(self) -> AdmissionReview {
        self.review
    }

    /// The underlying validation error.
    pub fn error(&self) -> &ValidationError {
        &self.source
    }
}
