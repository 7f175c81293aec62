//! Core types for reconciliation

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Separator between the parts of a composite handle.
const COMPOSITE_SEPARATOR: char = ':';

/// Opaque identifier addressing one remote resource instance.
///
/// The id is a name or a composite key (`part:part`); the ARN is filled in
/// once the remote API has assigned one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arn: Option<String>,
}

impl ResourceHandle {
    /// Create a handle from a name or id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            arn: None,
        }
    }

    /// Create a handle from a composite key.
    pub fn composite(parts: &[&str]) -> Self {
        Self::new(parts.join(&COMPOSITE_SEPARATOR.to_string()))
    }

    /// Attach the ARN assigned by the remote API.
    pub fn with_arn(mut self, arn: impl Into<String>) -> Self {
        self.arn = Some(arn.into());
        self
    }

    /// The id (name or composite key)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The ARN, if known
    pub fn arn(&self) -> Option<&str> {
        self.arn.as_deref()
    }

    /// Split a composite id into its parts
    pub fn parts(&self) -> Vec<&str> {
        self.id.split(COMPOSITE_SEPARATOR).collect()
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Status value reported by the remote API.
///
/// Never cached: every value is the result of a fresh probe.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    InProgress,
    Active,
    Inactive,
    Deprecated,
    Deleting,
    Enabled,
    Disabled,
    Error,
    PendingTransfer,
    RegisterInactive,
    /// A status this crate has no name for
    Other(String),
    /// The resource does not exist
    Absent,
}

impl Status {
    /// Wire spelling used by the remote API.
    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Deprecated => "DEPRECATED",
            Self::Deleting => "DELETING",
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
            Self::Error => "ERROR",
            Self::PendingTransfer => "PENDING_TRANSFER",
            Self::RegisterInactive => "REGISTER_INACTIVE",
            Self::Other(s) => s.as_str(),
            Self::Absent => "ABSENT",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl FromStr for Status {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Ok(match normalized.as_str() {
            "IN_PROGRESS" => Self::InProgress,
            "ACTIVE" => Self::Active,
            "INACTIVE" => Self::Inactive,
            "DEPRECATED" => Self::Deprecated,
            "DELETING" => Self::Deleting,
            "ENABLED" => Self::Enabled,
            "DISABLED" => Self::Disabled,
            "ERROR" => Self::Error,
            "PENDING_TRANSFER" => Self::PendingTransfer,
            "REGISTER_INACTIVE" => Self::RegisterInactive,
            "ABSENT" => Self::Absent,
            _ => Self::Other(s.trim().to_string()),
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or_else(|never| match never {}))
    }
}

/// One probe result: status plus diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub status: Status,
    /// Diagnostic accompanying the status
    pub reason: Option<String>,
    /// ARN reported by the remote API
    pub arn: Option<String>,
}

impl Observation {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            reason: None,
            arn: None,
        }
    }

    /// The distinguished not-found observation.
    pub fn absent() -> Self {
        Self::new(Status::Absent)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_arn(mut self, arn: impl Into<String>) -> Self {
        self.arn = Some(arn.into());
        self
    }

    pub fn is_absent(&self) -> bool {
        self.status.is_absent()
    }
}

/// Conditional retry configuration.
///
/// Retries use a fixed interval (propagation delay does not shrink with
/// backoff) and stop once `max_elapsed` has passed. Only errors whose code
/// or message contains one of `patterns` are retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Fixed delay between attempts
    #[serde(with = "duration_secs")]
    pub interval: Duration,
    /// Total time budget for retries
    #[serde(with = "duration_secs")]
    pub max_elapsed: Duration,
    /// Substrings that mark an error as transient
    pub patterns: Vec<String>,
}

impl RetryPolicy {
    /// Create a policy retrying errors that contain any of `patterns`.
    pub fn new(interval: Duration, max_elapsed: Duration, patterns: &[&str]) -> Self {
        Self {
            interval,
            max_elapsed,
            patterns: patterns.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    /// Pattern list as string slices (for `ErrorClassifier::matches`).
    pub fn pattern_refs(&self) -> Vec<&str> {
        self.patterns.iter().map(String::as_str).collect()
    }
}

/// Convergence contract for one wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSpec {
    /// Statuses that mean "keep waiting"
    pub pending: BTreeSet<Status>,
    /// Statuses that mean "done"
    pub target: BTreeSet<Status>,
    /// Give up after this long
    pub timeout: Duration,
    /// Delay between probes
    pub interval: Duration,
    /// Absence means done (deletion waits)
    pub absent_is_success: bool,
    /// Consecutive not-found probes tolerated before failing (creation waits)
    pub absent_grace: u32,
}

/// Default delay between probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default not-found tolerance for creation waits.
pub const DEFAULT_ABSENT_GRACE: u32 = 3;

impl PollSpec {
    /// Wait for a newly created or updated resource to reach `target`.
    pub fn creation(pending: &[Status], target: &[Status], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().cloned().collect(),
            target: target.iter().cloned().collect(),
            timeout,
            interval: DEFAULT_POLL_INTERVAL,
            absent_is_success: false,
            absent_grace: DEFAULT_ABSENT_GRACE,
        }
    }

    /// Wait for a resource to disappear.
    pub fn deletion(pending: &[Status], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().cloned().collect(),
            target: BTreeSet::new(),
            timeout,
            interval: DEFAULT_POLL_INTERVAL,
            absent_is_success: true,
            absent_grace: 0,
        }
    }

    /// Wait for `target`, treating every other known status as pending.
    pub fn until(known: &[Status], target: &[Status], timeout: Duration) -> Self {
        let target: BTreeSet<Status> = target.iter().cloned().collect();
        let absent_is_success = target.contains(&Status::Absent);
        Self {
            pending: known
                .iter()
                .filter(|s| !target.contains(*s))
                .cloned()
                .collect(),
            target,
            timeout,
            interval: DEFAULT_POLL_INTERVAL,
            absent_is_success,
            absent_grace: 0,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_absent_grace(mut self, grace: u32) -> Self {
        self.absent_grace = grace;
        self
    }

    /// Human-readable target set
    pub fn describe_target(&self) -> String {
        let mut names: Vec<&str> = self.target.iter().map(Status::as_str).collect();
        if self.absent_is_success && !self.target.contains(&Status::Absent) {
            names.push(Status::Absent.as_str());
        }
        names.join("|")
    }
}

/// Result of applying a reconciliation operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was removed
    Removed,
    /// Resource was already gone
    AlreadyAbsent,
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }
}

/// Normalized outcome reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub handle: ResourceHandle,
    pub result: ApplyResult,
    /// Final status, when the operation waited for one
    pub status: Option<Status>,
}

impl ReconcileOutcome {
    pub fn new(handle: ResourceHandle, result: ApplyResult) -> Self {
        Self {
            handle,
            result,
            status: None,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }
}

/// Summary of a batch of outcomes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ReconcileSummary {
    /// Add a successful outcome
    pub fn add(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::NoChange | ApplyResult::AlreadyAbsent => self.unchanged += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }

    /// Record a failure
    pub fn add_failure(&mut self) {
        self.failed += 1;
    }

    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.unchanged + self.skipped + self.failed
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
