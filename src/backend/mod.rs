//! Control-plane transport
//!
//! The thin CRUD layer the reconciliation engine talks to. Every call is
//! keyed by resource type and id and returns either a [`Record`] or the
//! remote's native [`RemoteError`], untranslated.

pub mod sandbox;

use chrono::{DateTime, Utc};
use converge::{ErrorClassifier, Observation, RemoteError, Status};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use sandbox::Sandbox;

/// Free-form attribute bag stored with a record
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Remote error codes
pub mod codes {
    pub const NOT_FOUND: &str = "ResourceNotFoundException";
    pub const NO_SUCH_ENTITY: &str = "NoSuchEntity";
    pub const ALREADY_EXISTS: &str = "ResourceAlreadyExistsException";
    pub const INVALID_REQUEST: &str = "InvalidRequestException";
    pub const CERTIFICATE_STATE: &str = "CertificateStateException";
    pub const INTERNAL_FAILURE: &str = "InternalFailureException";
}

/// Resource types the control plane knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Role,
    RoleAlias,
    Authorizer,
    CaCertificate,
    ThingType,
    TopicRuleDestination,
    Thing,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::RoleAlias => "role_alias",
            Self::Authorizer => "authorizer",
            Self::CaCertificate => "ca_certificate",
            Self::ThingType => "thing_type",
            Self::TopicRuleDestination => "topic_rule_destination",
            Self::Thing => "thing",
        }
    }

    /// ARN resource segment, e.g. `rolealias`
    fn arn_segment(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::RoleAlias => "rolealias",
            Self::Authorizer => "authorizer",
            Self::CaCertificate => "cacert",
            Self::ThingType => "thingtype",
            Self::TopicRuleDestination => "ruledestination",
            Self::Thing => "thing",
        }
    }

    /// Not-found error the remote returns for this type
    pub fn not_found(&self, id: &str) -> RemoteError {
        match self {
            Self::Role => RemoteError::new(
                codes::NO_SUCH_ENTITY,
                format!("The role with name {id} cannot be found."),
            ),
            _ => RemoteError::new(codes::NOT_FOUND, format!("{} {id} does not exist", self)),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status transitions that are not plain attribute updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Activate,
    Deactivate,
    Deprecate,
    Undeprecate,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Deprecate => "deprecate",
            Self::Undeprecate => "undeprecate",
        };
        f.write_str(name)
    }
}

/// A phase the remote finishes on its own after `ready_at`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pending {
    /// Status once the phase completes; `ABSENT` removes the record
    pub next: Status,
    pub ready_at: DateTime<Utc>,
}

/// One remote resource as the control plane reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub arn: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<Pending>,
}

impl Record {
    /// String attribute, if set
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(serde_json::Value::as_str)
    }
}

impl From<&Record> for Observation {
    fn from(record: &Record) -> Self {
        let observation = Observation::new(record.status.clone()).with_arn(&record.arn);
        match &record.reason {
            Some(reason) => observation.with_reason(reason),
            None => observation,
        }
    }
}

/// Remote read and mutation API.
pub trait ControlPlane: Send + Sync {
    fn describe(&self, kind: ResourceType, id: &str) -> Result<Record, RemoteError>;

    /// Create a new resource; fails if `id` is taken
    fn create(&self, kind: ResourceType, id: &str, attributes: Attributes)
    -> Result<Record, RemoteError>;

    /// Replace the attributes of an existing resource.
    ///
    /// Keys missing from `attributes` are removed. Returns whether anything
    /// changed.
    fn update(&self, kind: ResourceType, id: &str, attributes: Attributes)
    -> Result<bool, RemoteError>;

    fn transition(
        &self,
        kind: ResourceType,
        id: &str,
        transition: Transition,
    ) -> Result<Record, RemoteError>;

    /// Delete; some types finish asynchronously through `DELETING`
    fn delete(&self, kind: ResourceType, id: &str) -> Result<(), RemoteError>;
}

/// Serialize a typed config into an attribute bag
pub fn to_attributes<T: Serialize>(value: &T) -> Result<Attributes, serde_json::Error> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected a table of attributes, got {other}"
        ))),
    }
}

/// Id the control plane assigns a registered certificate
pub fn certificate_id(pem: &str) -> String {
    blake3::hash(pem.trim().as_bytes()).to_hex().to_string()
}

/// Classifier for this control plane's error codes
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsClassifier;

impl ErrorClassifier for AwsClassifier {
    fn is_absent(&self, error: &RemoteError) -> bool {
        error.code == codes::NOT_FOUND || error.code == codes::NO_SUCH_ENTITY
    }
}
