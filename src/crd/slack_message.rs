//! SlackMessage Custom Resource Definition.
//!
//! A SlackMessage binds a Slack channel to Kargo promotion events. The
//! admission webhook provisions the channel when the resource is admitted,
//! so every admitted SlackMessage points at a channel that exists.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Channel type value that requests a private Slack channel.
pub const PRIVATE_CHANNEL_TYPE: &str = "private";

/// SlackMessage is a custom resource describing a Slack notification target.
///
/// Example:
/// ```yaml
/// apiVersion: kargo.akuity.io/v1alpha1
/// kind: SlackMessage
/// metadata:
///   name: release-notes
///   namespace: kargo
/// spec:
///   slackChannel: kargo-notifications
///   message: "Pipeline {{.Stage.Name}} completed successfully"
///   channelType: public
///   subscriptions:
///     - stage: production
///       events: [PromoteSucceeded]
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kargo.akuity.io",
    version = "v1alpha1",
    kind = "SlackMessage",
    plural = "slackmessages",
    shortname = "slackmsg",
    status = "SlackMessageStatus",
    namespaced,
    printcolumn = r#"{"name":"Channel", "type":"string", "jsonPath":".spec.slackChannel"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SlackMessageSpec {
    /// Name of the Slack channel to provision and post into.
    #[serde(default)]
    pub slack_channel: String,

    /// Message template rendered by Kargo.
    #[serde(default)]
    pub message: String,

    /// Slack workspace/team, when the installation spans several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,

    /// `private` or `public` (default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,

    /// Stage/event pairs that trigger the message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscriptions: Vec<Subscription>,
}

impl SlackMessageSpec {
    /// Whether the channel should be created as private.
    pub fn is_private(&self) -> bool {
        self.channel_type.as_deref() == Some(PRIVATE_CHANNEL_TYPE)
    }
}

/// A single stage subscription.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Kargo stage name.
    #[serde(default)]
    pub stage: String,

    /// Events in that stage, e.g. `PromoteSucceeded`.
    #[serde(default)]
    pub events: Vec<String>,
}

impl Subscription {
    pub fn new(stage: &str, events: &[&str]) -> Self {
        Self {
            stage: stage.to_string(),
            events: events.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Status reported for a SlackMessage.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlackMessageStatus {
    /// RFC 3339 timestamp of channel creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}
