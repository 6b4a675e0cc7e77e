//! Slack channel provisioning client.
//!
//! The admission webhook provisions a channel for every SlackMessage it admits.
//! This module defines the backend seam (`ChannelProvisioner`) and the
//! in-memory registry that stands in for the Slack API.

mod channel_client;
mod types;

pub use channel_client::{ChannelProvisioner, InMemoryChannelClient, ProvisionError};
pub use types::ChannelRecord;
