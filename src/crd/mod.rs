//! Custom Resource Definitions for kargo-slack-webhook.
//!
//! - `SlackMessage`: Kargo notification target validated by the admission webhook

mod slack_message;

pub use slack_message::*;
