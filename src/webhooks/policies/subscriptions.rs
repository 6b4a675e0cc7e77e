//! Subscription policy.
//!
//! Validates, in list order:
//! - every subscription names a stage
//! - every subscription lists at least one event

use crate::crd::Subscription;
use crate::webhooks::error::ValidationError;

/// Validate subscriptions. The first malformed entry short-circuits the rest.
pub fn validate(subscriptions: &[Subscription]) -> Result<(), ValidationError> {
    for subscription in subscriptions {
        if subscription.stage.is_empty() {
            return Err(ValidationError::EmptySubscriptionStage);
        }
        if subscription.events.is_empty() {
            return Err(ValidationError::EmptySubscriptionEvents);
        }
    }
    Ok(())
}
