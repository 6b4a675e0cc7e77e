//! Required field policy.
//!
//! Validates:
//! - `spec.slackChannel` is non-empty
//! - `metadata.namespace` is non-empty

use kube::ResourceExt;

use crate::crd::SlackMessage;
use crate::webhooks::error::ValidationError;

/// Validate required fields, channel first.
pub fn validate(message: &SlackMessage) -> Result<(), ValidationError> {
    if message.spec.slack_channel.is_empty() {
        return Err(ValidationError::MissingField("slackChannel"));
    }

    if message.namespace().unwrap_or_default().is_empty() {
        return Err(ValidationError::MissingField("namespace"));
    }

    Ok(())
}
