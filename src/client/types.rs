//! Records kept by the channel provisioning client.

/// A provisioned Slack channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelRecord {
    /// Backend-assigned identifier, e.g. `C0000002a`.
    pub id: String,
    /// Display name the channel was created from.
    pub name: String,
    /// Whether the channel was created private.
    pub private: bool,
}

impl ChannelRecord {
    pub fn new(id: &str, name: &str, private: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            private,
        }
    }
}
