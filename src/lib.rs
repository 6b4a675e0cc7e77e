//! kargo-slack-webhook library crate
//!
//! Validating admission webhook for Kargo `SlackMessage` resources. Admitting a
//! SlackMessage provisions its Slack channel; the decision is bounded by a
//! per-request time budget.

pub mod client;
pub mod config;
pub mod crd;
pub mod health;
pub mod webhooks;

pub use client::{ChannelProvisioner, InMemoryChannelClient, ProvisionError};
pub use config::{ConfigError, WebhookConfig};
pub use health::{HealthState, run_health_server};
pub use webhooks::{
    Rejection, ValidationError, Validator, WebhookError, run_receiver_server, run_webhook_server,
};
