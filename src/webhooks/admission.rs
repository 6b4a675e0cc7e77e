//! AdmissionReview wire envelope.
//!
//! Only the subset of `admission.k8s.io/v1` this webhook reads and writes is
//! modelled. Inbound fields all default when absent, so a sparse review still
//! decodes and the candidate object is judged by the validator instead.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// API version written on every response.
pub const ADMISSION_API_VERSION: &str = "admission.k8s.io/v1";
/// Kind written on every response.
pub const ADMISSION_KIND: &str = "AdmissionReview";
/// `result.status` value for denials.
pub const FAILURE_STATUS: &str = "Failure";

/// Errors decoding an inbound review.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed admission review: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("request.object is missing or not a JSON object")]
    NotAnObject,

    #[error("request.object does not match the expected resource: {0}")]
    Payload(#[source] serde_json::Error),
}

/// Inbound `AdmissionReview` carrying a request.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReviewRequest {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub request: AdmissionRequest,
}

impl AdmissionReviewRequest {
    /// Parse a review from a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(body).map_err(DecodeError::Envelope)
    }
}

/// The `request` half of an AdmissionReview.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub user_info: Value,
    #[serde(default)]
    pub object: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_object: Option<Value>,
    #[serde(default)]
    pub resource: GroupVersionResource,
    #[serde(default)]
    pub sub_resource: String,
}

impl AdmissionRequest {
    /// Decode the candidate object into a typed resource.
    ///
    /// The object must be a JSON mapping. Anything else is a decode error and
    /// never reaches validation. Inside the mapping, `null` members and a
    /// missing `metadata` or `spec` decode as zero values.
    pub fn candidate<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let Some(Value::Object(object)) = &self.object else {
            return Err(DecodeError::NotAnObject);
        };

        let mut object = Value::Object(object.clone());
        drop_nulls(&mut object);
        if let Value::Object(members) = &mut object {
            for key in ["metadata", "spec"] {
                members
                    .entry(key)
                    .or_insert_with(|| Value::Object(Map::new()));
            }
        }

        serde_json::from_value(object).map_err(DecodeError::Payload)
    }
}

/// Remove `null` members so they fall back to their field defaults.
fn drop_nulls(value: &mut Value) {
    match value {
        Value::Object(members) => {
            members.retain(|_, member| !member.is_null());
            members.values_mut().for_each(drop_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(drop_nulls),
        _ => {}
    }
}

/// Resource descriptor of an admission request.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct GroupVersionResource {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub resource: String,
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.version, self.resource)
    }
}

/// Outbound `AdmissionReview` carrying the decision.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    pub api_version: String,
    pub kind: String,
    pub response: AdmissionResponse,
}

impl AdmissionReview {
    /// A review that admits the request.
    pub fn allowed(uid: impl Into<String>) -> Self {
        Self {
            api_version: ADMISSION_API_VERSION.to_string(),
            kind: ADMISSION_KIND.to_string(),
            response: AdmissionResponse {
                uid: uid.into(),
                allowed: true,
                patch: None,
                patch_type: None,
                result: None,
            },
        }
    }

    /// Turn this review into a denial with the given reason.
    pub fn deny(mut self, reason: impl Into<String>) -> Self {
        self.response.allowed = false;
        self.response.result = Some(AdmissionResult {
            status: FAILURE_STATUS.to_string(),
            reason: reason.into(),
        });
        self
    }

    pub fn uid(&self) -> &str {
        &self.response.uid
    }

    pub fn is_allowed(&self) -> bool {
        self.response.allowed
    }

    /// Denial reason, if any.
    pub fn reason(&self) -> Option<&str> {
        self.response.result.as_ref().map(|r| r.reason.as_str())
    }
}

/// The `response` half of an AdmissionReview.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    /// Base64-encoded JSON patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AdmissionResult>,
}

/// Structured denial result.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AdmissionResult {
    pub status: String,
    pub reason: String,
}
