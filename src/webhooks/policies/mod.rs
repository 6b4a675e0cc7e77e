//! Field policies for SlackMessage admission.
//!
//! Policies run in a fixed order and the first violation wins:
//! - Required fields: checked before the channel is provisioned
//! - Subscriptions: checked after the channel is provisioned, in list order

pub mod required_fields;
pub mod subscriptions;
