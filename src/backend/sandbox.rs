//! Local sandbox control plane
//!
//! Simulates an eventually consistent IoT control plane in a JSON state
//! file so asynchronous phases play out across CLI invocations:
//!
//! - roles cannot be assumed until a propagation delay has passed
//! - active authorizers and CA certificates refuse deletion
//! - deprecated thing types cannot be deleted for a deprecation window
//! - topic rule destinations sit in `IN_PROGRESS` until confirmed and in
//!   `DELETING` before they disappear
//!
//! Pending phases are settled lazily against the time source on every call.

use super::{Attributes, ControlPlane, Pending, Record, ResourceType, Transition, codes};
use chrono::{DateTime, TimeDelta, Utc};
use converge::{RemoteError, Status};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Failure reading or writing the state file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read sandbox state {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse sandbox state {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to lock sandbox state {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write sandbox state {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize sandbox state: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl From<StoreError> for RemoteError {
    fn from(e: StoreError) -> Self {
        RemoteError::new(codes::INTERNAL_FAILURE, e.to_string())
    }
}

/// Timing and identity of the simulated control plane
#[derive(Debug, Clone)]
pub struct Behavior {
    pub account: String,
    pub region: String,
    /// Age a role must reach before it can be assumed
    pub propagation_delay: Duration,
    /// Time a topic rule destination spends in IN_PROGRESS
    pub activation_delay: Duration,
    /// Time a topic rule destination spends in DELETING
    pub deletion_delay: Duration,
    /// Minimum age of a deprecation before a thing type can be deleted
    pub deprecation_window: Duration,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            account: "123456789012".to_string(),
            region: "us-east-1".to_string(),
            propagation_delay: Duration::from_secs(8),
            activation_delay: Duration::from_secs(15),
            deletion_delay: Duration::from_secs(10),
            deprecation_window: Duration::from_secs(300),
        }
    }
}

/// Source of "now" for the simulated control plane
pub type TimeSource = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    records: BTreeMap<ResourceType, BTreeMap<String, Record>>,
}

impl Document {
    /// Current contents of `path`; a missing file is an empty document
    fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Atomically replace `path` with this document
    fn save(&self, path: &Path) -> Result<(), StoreError> {
        let write_error = |source: io::Error| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let content = serde_json::to_vec_pretty(self).map_err(StoreError::Serialize)?;
        let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
        file.write_all(&content).map_err(write_error)?;
        file.as_file().sync_all().map_err(write_error)?;
        file.persist(path).map_err(|e| write_error(e.error))?;
        Ok(())
    }

    fn get(&self, kind: ResourceType, id: &str) -> Option<&Record> {
        self.records.get(&kind).and_then(|m| m.get(id))
    }

    fn get_mut(&mut self, kind: ResourceType, id: &str) -> Result<&mut Record, RemoteError> {
        self.records
            .get_mut(&kind)
            .and_then(|m| m.get_mut(id))
            .ok_or_else(|| kind.not_found(id))
    }

    fn remove(&mut self, kind: ResourceType, id: &str) {
        if let Some(m) = self.records.get_mut(&kind) {
            m.remove(id);
        }
    }

    /// Complete every pending phase that is due
    fn settle(&mut self, now: DateTime<Utc>) {
        for records in self.records.values_mut() {
            records.retain(|_, record| {
                let Some(pending) = record.pending.take_if(|p| p.ready_at <= now) else {
                    return true;
                };
                if pending.next.is_absent() {
                    log::debug!("sandbox: {} finished deleting", record.id);
                    return false;
                }
                log::debug!("sandbox: {} settled at {}", record.id, pending.next);
                record.status = pending.next;
                record.reason = None;
                record.updated_at = pending.ready_at;
                true
            });
        }
    }
}

/// File-backed (or in-memory) simulated control plane.
pub struct Sandbox {
    doc: Mutex<Document>,
    path: Option<PathBuf>,
    behavior: Behavior,
    now: TimeSource,
}

impl Sandbox {
    /// Sandbox that keeps state in memory only
    pub fn in_memory(behavior: Behavior) -> Self {
        Self {
            doc: Mutex::new(Document::default()),
            path: None,
            behavior,
            now: Box::new(Utc::now),
        }
    }

    /// Sandbox persisted at `path`; a missing file starts empty.
    ///
    /// Every call re-reads the file under an exclusive lock, so several
    /// handles (or processes) on the same path see each other's writes.
    pub fn open(path: &Path, behavior: Behavior) -> Result<Self, StoreError> {
        if path.exists() {
            log::debug!("Loading sandbox state from {}", path.display());
        } else {
            log::debug!("Sandbox state {} does not exist, starting empty", path.display());
        }
        let doc = Document::load(path)?;

        Ok(Self {
            doc: Mutex::new(doc),
            path: Some(path.to_path_buf()),
            behavior,
            now: Box::new(Utc::now),
        })
    }

    /// Replace the wall clock
    pub fn with_time_source(
        mut self,
        now: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        self.now = Box::new(now);
        self
    }

    /// Every record of `kind`, sorted by id
    #[cfg(test)]
    pub fn list(&self, kind: ResourceType) -> Result<Vec<Record>, RemoteError> {
        self.with_doc(|doc, _| {
            Ok(doc
                .records
                .get(&kind)
                .map(|m| m.values().cloned().collect())
                .unwrap_or_default())
        })
    }

    fn with_doc<T>(
        &self,
        f: impl FnOnce(&mut Document, DateTime<Utc>) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let mut doc = self.doc.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(path) = &self.path else {
            let now = (self.now)();
            doc.settle(now);
            return f(&mut doc, now);
        };

        // Held until the end of the call; dropping the file releases it
        let _lock = lock_state(path)?;
        *doc = Document::load(path)?;
        let before = doc.clone();
        let now = (self.now)();
        doc.settle(now);
        let result = f(&mut doc, now);
        if *doc != before {
            doc.save(path)?;
        }
        result
    }

    fn arn(&self, kind: ResourceType, id: &str) -> String {
        match kind {
            ResourceType::Role => format!("arn:aws:iam::{}:role/{id}", self.behavior.account),
            _ => format!(
                "arn:aws:iot:{}:{}:{}/{id}",
                self.behavior.region,
                self.behavior.account,
                kind.arn_segment()
            ),
        }
    }

    /// Reject mutations whose references are not usable yet
    fn check_references(
        &self,
        doc: &Document,
        kind: ResourceType,
        attributes: &Attributes,
        now: DateTime<Utc>,
    ) -> Result<(), RemoteError> {
        match kind {
            ResourceType::RoleAlias => {
                let Some(role_arn) = attributes.get("role_arn").and_then(|v| v.as_str()) else {
                    return Ok(());
                };
                let name = role_arn.rsplit('/').next().unwrap_or(role_arn);
                let role = doc.get(ResourceType::Role, name).ok_or_else(|| {
                    invalid(format!("Role {role_arn} does not exist"))
                })?;
                if age(now, role.created_at) < self.behavior.propagation_delay {
                    return Err(invalid(format!(
                        "The role {role_arn} cannot be assumed by AWS IoT. Please try again in a few seconds"
                    )));
                }
                Ok(())
            }
            ResourceType::Thing => {
                let Some(type_name) = attributes.get("thing_type_name").and_then(|v| v.as_str())
                else {
                    return Ok(());
                };
                match doc.get(ResourceType::ThingType, type_name) {
                    None => Err(invalid(format!("Thing type {type_name} does not exist"))),
                    Some(t) if t.status == Status::Deprecated => Err(invalid(format!(
                        "Can not create new thing with deprecated thing type {type_name}"
                    ))),
                    Some(_) => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }
}

fn invalid(message: String) -> RemoteError {
    RemoteError::new(codes::INVALID_REQUEST, message)
}

fn age(now: DateTime<Utc>, since: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}

/// Exclusive advisory lock on `<path>.lock`, creating the state directory
fn lock_state(path: &Path) -> Result<File, StoreError> {
    let mut lock_path = path.as_os_str().to_owned();
    lock_path.push(".lock");
    let lock_path = PathBuf::from(lock_path);
    let lock_error = |source: io::Error| StoreError::Lock {
        path: lock_path.clone(),
        source,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(lock_error)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(lock_error)?;
    file.lock_exclusive().map_err(lock_error)?;
    Ok(file)
}

fn after(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn destination_target(attributes: &Attributes) -> Status {
    match attributes.get("enabled").and_then(serde_json::Value::as_bool) {
        Some(false) => Status::Disabled,
        _ => Status::Enabled,
    }
}

impl ControlPlane for Sandbox {
    fn describe(&self, kind: ResourceType, id: &str) -> Result<Record, RemoteError> {
        self.with_doc(|doc, _| doc.get(kind, id).cloned().ok_or_else(|| kind.not_found(id)))
    }

    fn create(
        &self,
        kind: ResourceType,
        id: &str,
        attributes: Attributes,
    ) -> Result<Record, RemoteError> {
        self.with_doc(|doc, now| {
            if doc.get(kind, id).is_some() {
                return Err(RemoteError::new(
                    codes::ALREADY_EXISTS,
                    format!("{kind} {id} already exists"),
                ));
            }
            self.check_references(doc, kind, &attributes, now)?;

            let (status, reason, pending) = match kind {
                ResourceType::Authorizer | ResourceType::CaCertificate => {
                    let status = attributes
                        .get("status")
                        .and_then(|v| v.as_str())
                        .map_or(Status::Active, |s| s.parse().unwrap_or_else(|never| match never {}));
                    (status, None, None)
                }
                ResourceType::TopicRuleDestination => (
                    Status::InProgress,
                    Some("Awaiting endpoint confirmation".to_string()),
                    Some(Pending {
                        next: destination_target(&attributes),
                        ready_at: after(now, self.behavior.activation_delay),
                    }),
                ),
                _ => (Status::Active, None, None),
            };

            let record = Record {
                id: id.to_string(),
                arn: self.arn(kind, id),
                status,
                reason,
                attributes,
                created_at: now,
                updated_at: now,
                pending,
            };
            log::debug!("sandbox: created {kind} {id} ({})", record.status);
            doc.records
                .entry(kind)
                .or_default()
                .insert(id.to_string(), record.clone());
            Ok(record)
        })
    }

    fn update(
        &self,
        kind: ResourceType,
        id: &str,
        attributes: Attributes,
    ) -> Result<bool, RemoteError> {
        self.with_doc(|doc, now| {
            self.check_references(doc, kind, &attributes, now)?;
            let activation_delay = self.behavior.activation_delay;
            let record = doc.get_mut(kind, id)?;
            if record.status == Status::Deleting {
                return Err(invalid(format!("{kind} {id} is being deleted")));
            }

            if record.attributes == attributes {
                return Ok(false);
            }
            record.attributes = attributes;

            match kind {
                ResourceType::Authorizer | ResourceType::CaCertificate => {
                    if let Some(status) = record.attr_str("status") {
                        let status: Status = status.parse().unwrap_or_else(|never| match never {});
                        if record.status != status {
                            record.status = status;
                            record.updated_at = now;
                        }
                    }
                }
                ResourceType::TopicRuleDestination => {
                    record.status = Status::InProgress;
                    record.reason = Some("Awaiting endpoint confirmation".to_string());
                    record.updated_at = now;
                    record.pending = Some(Pending {
                        next: destination_target(&record.attributes),
                        ready_at: after(now, activation_delay),
                    });
                }
                _ => {}
            }
            log::debug!("sandbox: updated {kind} {id}");
            Ok(true)
        })
    }

    fn transition(
        &self,
        kind: ResourceType,
        id: &str,
        transition: Transition,
    ) -> Result<Record, RemoteError> {
        self.with_doc(|doc, now| {
            let record = doc.get_mut(kind, id)?;
            let next = match (kind, transition) {
                (ResourceType::Authorizer | ResourceType::CaCertificate, Transition::Activate) => {
                    Status::Active
                }
                (
                    ResourceType::Authorizer | ResourceType::CaCertificate,
                    Transition::Deactivate,
                ) => Status::Inactive,
                (ResourceType::ThingType, Transition::Deprecate) => Status::Deprecated,
                (ResourceType::ThingType, Transition::Undeprecate) => Status::Active,
                _ => return Err(invalid(format!("Cannot {transition} a {kind}"))),
            };

            if record.status != next {
                log::debug!("sandbox: {kind} {id} {} -> {next}", record.status);
                if record.attributes.contains_key("status") {
                    record
                        .attributes
                        .insert("status".to_string(), next.as_str().into());
                }
                record.status = next;
                record.updated_at = now;
            }
            Ok(record.clone())
        })
    }

    fn delete(&self, kind: ResourceType, id: &str) -> Result<(), RemoteError> {
        let window = self.behavior.deprecation_window;
        let deletion_delay = self.behavior.deletion_delay;
        self.with_doc(|doc, now| {
            let record = doc.get_mut(kind, id)?;
            match kind {
                ResourceType::Authorizer if record.status == Status::Active => {
                    return Err(invalid(format!(
                        "Cannot delete authorizer {id} while it is ACTIVE"
                    )));
                }
                ResourceType::CaCertificate if record.status == Status::Active => {
                    return Err(RemoteError::new(
                        codes::CERTIFICATE_STATE,
                        format!("Certificate {id} must be deactivated before deletion"),
                    ));
                }
                ResourceType::ThingType => {
                    if record.status != Status::Deprecated {
                        return Err(invalid(format!(
                            "Thing type {id} must be deprecated before deletion"
                        )));
                    }
                    if age(now, record.updated_at) < window {
                        return Err(invalid(
                            "Please wait for 5 minutes after deprecation and then retry"
                                .to_string(),
                        ));
                    }
                }
                ResourceType::TopicRuleDestination => {
                    if record.status != Status::Deleting {
                        record.status = Status::Deleting;
                        record.reason = None;
                        record.updated_at = now;
                        record.pending = Some(Pending {
                            next: Status::Absent,
                            ready_at: after(now, deletion_delay),
                        });
                    }
                    return Ok(());
                }
                _ => {}
            }
            doc.remove(kind, id);
            log::debug!("sandbox: deleted {kind} {id}");
            Ok(())
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use converge::ManualClock;

    /// In-memory sandbox whose time follows `clock`
    pub fn on_clock(clock: &ManualClock, behavior: Behavior) -> Sandbox {
        let origin = Utc::now();
        let clock = clock.clone();
        Sandbox::in_memory(behavior)
            .with_time_source(move || origin + TimeDelta::from_std(clock.elapsed()).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::on_clock;
    use super::*;
    use converge::ManualClock;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    fn setup() -> (ManualClock, Sandbox) {
        let clock = ManualClock::new();
        let sandbox = on_clock(&clock, Behavior::default());
        (clock, sandbox)
    }

    #[test]
    fn test_create_then_describe() {
        let (_, sandbox) = setup();

        let created = sandbox
            .create(ResourceType::Thing, "sensor-1", Attributes::new())
            .unwrap();
        let described = sandbox.describe(ResourceType::Thing, "sensor-1").unwrap();

        assert_eq!(created, described);
        assert_eq!(
            described.arn,
            "arn:aws:iot:us-east-1:123456789012:thing/sensor-1"
        );
        assert_eq!(described.status, Status::Active);
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let (_, sandbox) = setup();
        sandbox
            .create(ResourceType::Thing, "sensor-1", Attributes::new())
            .unwrap();

        let err = sandbox
            .create(ResourceType::Thing, "sensor-1", Attributes::new())
            .unwrap_err();

        assert_eq!(err.code, codes::ALREADY_EXISTS);
    }

    #[test]
    fn test_not_found_codes() {
        let (_, sandbox) = setup();
        assert_eq!(
            sandbox.describe(ResourceType::Thing, "x").unwrap_err().code,
            codes::NOT_FOUND
        );
        assert_eq!(
            sandbox.describe(ResourceType::Role, "x").unwrap_err().code,
            codes::NO_SUCH_ENTITY
        );
        assert_eq!(
            sandbox.delete(ResourceType::Thing, "x").unwrap_err().code,
            codes::NOT_FOUND
        );
    }

    #[test]
    fn test_role_alias_waits_for_role_propagation() {
        let (clock, sandbox) = setup();
        let role = sandbox
            .create(ResourceType::Role, "iot-access", Attributes::new())
            .unwrap();
        let alias = attrs(json!({ "role_arn": role.arn }));

        let err = sandbox
            .create(ResourceType::RoleAlias, "access", alias.clone())
            .unwrap_err();
        assert!(err.message.contains("cannot be assumed"));
        assert!(err.message.contains("try again in a few seconds"));

        clock.advance(Duration::from_secs(8));
        sandbox
            .create(ResourceType::RoleAlias, "access", alias)
            .unwrap();
    }

    #[test]
    fn test_role_alias_missing_role_is_not_transient() {
        let (_, sandbox) = setup();
        let alias = attrs(json!({ "role_arn": "arn:aws:iam::123456789012:role/missing" }));

        let err = sandbox
            .create(ResourceType::RoleAlias, "access", alias)
            .unwrap_err();

        assert!(err.message.contains("does not exist"));
        assert!(!err.message.contains("cannot be assumed"));
    }

    #[test]
    fn test_active_authorizer_refuses_delete() {
        let (_, sandbox) = setup();
        sandbox
            .create(
                ResourceType::Authorizer,
                "auth",
                attrs(json!({ "status": "ACTIVE" })),
            )
            .unwrap();

        let err = sandbox.delete(ResourceType::Authorizer, "auth").unwrap_err();
        assert!(err.message.contains("ACTIVE"));

        let record = sandbox
            .transition(ResourceType::Authorizer, "auth", Transition::Deactivate)
            .unwrap();
        assert_eq!(record.status, Status::Inactive);
        assert_eq!(record.attr_str("status"), Some("INACTIVE"));

        sandbox.delete(ResourceType::Authorizer, "auth").unwrap();
    }

    #[test]
    fn test_active_ca_certificate_refuses_delete() {
        let (_, sandbox) = setup();
        sandbox
            .create(ResourceType::CaCertificate, "abc", Attributes::new())
            .unwrap();

        let err = sandbox
            .delete(ResourceType::CaCertificate, "abc")
            .unwrap_err();

        assert_eq!(err.code, codes::CERTIFICATE_STATE);
    }

    #[test]
    fn test_thing_type_deprecation_window() {
        let (clock, sandbox) = setup();
        sandbox
            .create(ResourceType::ThingType, "sensor", Attributes::new())
            .unwrap();

        let err = sandbox.delete(ResourceType::ThingType, "sensor").unwrap_err();
        assert!(err.message.contains("must be deprecated"));

        sandbox
            .transition(ResourceType::ThingType, "sensor", Transition::Deprecate)
            .unwrap();
        clock.advance(Duration::from_secs(120));
        let err = sandbox.delete(ResourceType::ThingType, "sensor").unwrap_err();
        assert!(err.message.contains("wait for 5 minutes after deprecation"));

        clock.advance(Duration::from_secs(180));
        sandbox.delete(ResourceType::ThingType, "sensor").unwrap();
    }

    #[test]
    fn test_thing_rejects_deprecated_type() {
        let (_, sandbox) = setup();
        sandbox
            .create(ResourceType::ThingType, "sensor", Attributes::new())
            .unwrap();
        sandbox
            .transition(ResourceType::ThingType, "sensor", Transition::Deprecate)
            .unwrap();

        let err = sandbox
            .create(
                ResourceType::Thing,
                "s1",
                attrs(json!({ "thing_type_name": "sensor" })),
            )
            .unwrap_err();

        assert!(err.message.contains("deprecated thing type"));
    }

    #[test]
    fn test_destination_lifecycle() {
        let (clock, sandbox) = setup();
        let created = sandbox
            .create(
                ResourceType::TopicRuleDestination,
                "hook",
                attrs(json!({ "endpoint_url": "https://example.com/hook", "enabled": true })),
            )
            .unwrap();
        assert_eq!(created.status, Status::InProgress);
        assert!(created.reason.is_some());

        clock.advance(Duration::from_secs(15));
        let record = sandbox
            .describe(ResourceType::TopicRuleDestination, "hook")
            .unwrap();
        assert_eq!(record.status, Status::Enabled);
        assert_eq!(record.reason, None);

        sandbox
            .delete(ResourceType::TopicRuleDestination, "hook")
            .unwrap();
        let record = sandbox
            .describe(ResourceType::TopicRuleDestination, "hook")
            .unwrap();
        assert_eq!(record.status, Status::Deleting);

        clock.advance(Duration::from_secs(10));
        let err = sandbox
            .describe(ResourceType::TopicRuleDestination, "hook")
            .unwrap_err();
        assert_eq!(err.code, codes::NOT_FOUND);
    }

    #[test]
    fn test_update_reports_change() {
        let (clock, sandbox) = setup();
        sandbox
            .create(
                ResourceType::TopicRuleDestination,
                "hook",
                attrs(json!({ "enabled": true })),
            )
            .unwrap();
        clock.advance(Duration::from_secs(15));

        let unchanged = sandbox
            .update(
                ResourceType::TopicRuleDestination,
                "hook",
                attrs(json!({ "enabled": true })),
            )
            .unwrap();
        let changed = sandbox
            .update(
                ResourceType::TopicRuleDestination,
                "hook",
                attrs(json!({ "enabled": false })),
            )
            .unwrap();

        assert!(!unchanged);
        assert!(changed);
        clock.advance(Duration::from_secs(15));
        let record = sandbox
            .describe(ResourceType::TopicRuleDestination, "hook")
            .unwrap();
        assert_eq!(record.status, Status::Disabled);
    }

    #[test]
    fn test_state_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("sandbox.json");

        {
            let sandbox = Sandbox::open(&path, Behavior::default()).unwrap();
            sandbox
                .create(ResourceType::Thing, "sensor-1", Attributes::new())
                .unwrap();
        }

        let reopened = Sandbox::open(&path, Behavior::default()).unwrap();
        let records = reopened.list(ResourceType::Thing).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "sensor-1");
    }

    #[test]
    fn test_corrupt_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandbox.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Sandbox::open(&path, Behavior::default()).err().unwrap();

        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn test_update_replaces_attributes() {
        let (_, sandbox) = setup();
        sandbox
            .create(
                ResourceType::Thing,
                "sensor-1",
                attrs(json!({ "thing_type_name": "sensor", "attributes": { "serial": "A1" } })),
            )
            .unwrap();

        let changed = sandbox
            .update(
                ResourceType::Thing,
                "sensor-1",
                attrs(json!({ "thing_type_name": "sensor" })),
            )
            .unwrap();

        assert!(changed);
        let record = sandbox.describe(ResourceType::Thing, "sensor-1").unwrap();
        assert_eq!(record.attr_str("thing_type_name"), Some("sensor"));
        assert!(!record.attributes.contains_key("attributes"));
    }

    #[test]
    fn test_handles_see_each_others_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandbox.json");
        let first = Sandbox::open(&path, Behavior::default()).unwrap();
        let second = Sandbox::open(&path, Behavior::default()).unwrap();

        first
            .create(ResourceType::Thing, "sensor-1", Attributes::new())
            .unwrap();
        second.describe(ResourceType::Thing, "sensor-1").unwrap();
        second.delete(ResourceType::Thing, "sensor-1").unwrap();

        let err = first
            .describe(ResourceType::Thing, "sensor-1")
            .unwrap_err();
        assert_eq!(err.code, codes::NOT_FOUND);
        let reopened = Sandbox::open(&path, Behavior::default()).unwrap();
        assert!(reopened.list(ResourceType::Thing).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_handles_lose_no_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandbox.json");
        let first = Sandbox::open(&path, Behavior::default()).unwrap();
        let second = Sandbox::open(&path, Behavior::default()).unwrap();

        std::thread::scope(|s| {
            for (prefix, sandbox) in [("a", &first), ("b", &second)] {
                s.spawn(move || {
                    for i in 0..10 {
                        sandbox
                            .create(ResourceType::Thing, &format!("{prefix}-{i}"), Attributes::new())
                            .unwrap();
                    }
                });
            }
        });

        let reopened = Sandbox::open(&path, Behavior::default()).unwrap();
        assert_eq!(reopened.list(ResourceType::Thing).unwrap().len(), 20);
    }

    #[test]
    fn test_reads_leave_state_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandbox.json");
        let sandbox = Sandbox::open(&path, Behavior::default()).unwrap();
        sandbox
            .create(ResourceType::Thing, "sensor-1", Attributes::new())
            .unwrap();
        let compact: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        fs::write(&path, compact.to_string()).unwrap();

        sandbox.describe(ResourceType::Thing, "sensor-1").unwrap();
        sandbox.list(ResourceType::Thing).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), compact.to_string());
    }
}
