//! SlackMessage validator.
//!
//! A validation races the domain check against a fixed budget. The check runs
//! as its own task so a slow backend cannot delay the decision: whichever of
//! "check finished", "budget elapsed" or "caller cancelled" happens first
//! decides. A check that loses the race is detached, and its cancellation
//! token is tripped so it stops at its next suspension point and releases the
//! client lock on its own path. Its eventual result is discarded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::ChannelProvisioner;
use crate::crd::SlackMessage;
use crate::health::HealthState;
use crate::webhooks::admission::AdmissionReview;
use crate::webhooks::error::{Rejection, ValidationError};
use crate::webhooks::policies::{required_fields, subscriptions};

/// Default validation budget.
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(30);

const TIMEOUT_REASON: &str = "Slack channel validation timeout";

/// Admission validator for SlackMessage resources.
#[derive(Clone)]
pub struct Validator {
    channels: Arc<dyn ChannelProvisioner>,
    timeout: Duration,
    /// Optional health state for metrics
    health_state: Option<Arc<HealthState>>,
}

impl Validator {
    /// Create a validator with the default 30s budget.
    pub fn new(channels: Arc<dyn ChannelProvisioner>) -> Self {
        Self {
            channels,
            timeout: DEFAULT_VALIDATION_TIMEOUT,
            health_state: None,
        }
    }

    /// Override the validation budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Record decisions in the shared metrics.
    pub fn with_health_state(mut self, health_state: Arc<HealthState>) -> Self {
        self.health_state = Some(health_state);
        self
    }

    /// The validation budget.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validate a SlackMessage under a freshly generated response uid.
    pub async fn validate(
        &self,
        parent: &CancellationToken,
        message: SlackMessage,
    ) -> Result<AdmissionReview, Rejection> {
        self.validate_with_uid(parent, Uuid::new_v4().to_string(), message)
            .await
    }

    /// Validate a SlackMessage, answering under `uid`.
    ///
    /// Returns the admitting review on success. On any failure, including the
    /// budget running out, returns a `Rejection` whose review is already a
    /// complete denial.
    pub async fn validate_with_uid(
        &self,
        parent: &CancellationToken,
        uid: String,
        message: SlackMessage,
    ) -> Result<AdmissionReview, Rejection> {
        let started = Instant::now();
        let review = AdmissionReview::allowed(uid);

        let namespace = message.namespace().unwrap_or_default();
        let name = message.name_any();
        let channel = message.spec.slack_channel.clone();

        let scope = parent.child_token();
        // Trips the check's token on every exit path, including timeout.
        let _cancel_check = scope.clone().drop_guard();

        let check = tokio::spawn(check_message(
            self.channels.clone(),
            scope,
            message,
            self.health_state.clone(),
        ));

        let outcome = tokio::select! {
            joined = check => {
                joined.unwrap_or_else(|e| Err(ValidationError::CheckAborted(e.to_string())))
            }
            () = tokio::time::sleep(self.timeout) => Err(ValidationError::Timeout(self.timeout)),
            () = parent.cancelled() => Err(ValidationError::Cancelled),
        };

        if let Some(state) = &self.health_state {
            state.metrics.record_validation(
                outcome.as_ref().err().map(ValidationError::kind),
                started.elapsed().as_secs_f64(),
            );
        }

        match outcome {
            Ok(()) => {
                info!(
                    uid = %review.uid(),
                    namespace = %namespace,
                    name = %name,
                    channel = %channel,
                    "Validated SlackMessage"
                );
                Ok(review)
            }
            Err(error) => {
                let reason = if error.is_deadline() {
                    warn!(
                        uid = %review.uid(),
                        budget = ?self.timeout,
                        error = %error,
                        "Slack channel validation did not finish in time"
                    );
                    TIMEOUT_REASON.to_string()
                } else {
                    warn!(
                        uid = %review.uid(),
                        namespace = %namespace,
                        name = %name,
                        error = %error,
                        "Slack channel validation failed"
                    );
                    format!("Slack channel validation failed: {error}")
                };
                Err(Rejection::new(review.deny(reason), error))
            }
        }
    }
}

/// The domain check: required fields, provisioning, then subscriptions.
async fn check_message(
    channels: Arc<dyn ChannelProvisioner>,
    cancel: CancellationToken,
    message: SlackMessage,
    health_state: Option<Arc<HealthState>>,
) -> Result<(), ValidationError> {
    required_fields::validate(&message)?;

    let spec = &message.spec;
    let id = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(ValidationError::Cancelled),
        created = channels.create_channel(&spec.slack_channel, spec.is_private()) => created?,
    };
    if let Some(state) = &health_state {
        state.metrics.record_channel_provisioned();
    }

    let exists = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(ValidationError::Cancelled),
        exists = channels.channel_exists(&id) => exists,
    };
    if !exists {
        return Err(ValidationError::ChannelNotFound(id));
    }

    subscriptions::validate(&spec.subscriptions)?;

    debug!(channel = %spec.slack_channel, id = %id, "Slack channel validated");
    Ok(())
}
