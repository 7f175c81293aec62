//! In-memory resource kind shared by the reconcile and registry tests

use crate::error::{Error, RemoteError, Result};
use crate::reconcile::ResourceKind;
use crate::teardown::{TeardownPlan, remote_call};
use crate::types::{Observation, PollSpec, ResourceHandle, RetryPolicy, Status};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub const NOT_FOUND: &str = "ResourceNotFoundException";
pub const ALREADY_EXISTS: &str = "ResourceAlreadyExistsException";
pub const NOT_ASSUMABLE: &str = "cannot be assumed";

#[derive(Debug, Clone, Deserialize)]
pub struct WidgetConfig {
    pub name: String,
    #[serde(default)]
    pub size: u32,
}

struct Stored {
    size: u32,
    pending_probes: u32,
}

/// Widgets live in a map; creation can fail transiently and activation
/// reports IN_PROGRESS for a fixed number of probes.
#[derive(Default)]
pub struct Widgets {
    store: Mutex<HashMap<String, Stored>>,
    transient_failures: Mutex<u32>,
    activation_probes: u32,
    retry: Option<RetryPolicy>,
    calls: Mutex<Vec<&'static str>>,
}

impl Widgets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` creates with a propagation error
    pub fn failing_creates(mut self, n: u32, policy: RetryPolicy) -> Self {
        self.transient_failures = Mutex::new(n);
        self.retry = Some(policy);
        self
    }

    /// Report IN_PROGRESS for `n` probes after each create or update
    pub fn activating(mut self, n: u32) -> Self {
        self.activation_probes = n;
        self
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == name).count()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.store.lock().unwrap().contains_key(name)
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn remove(&self, handle: &ResourceHandle) -> std::result::Result<(), RemoteError> {
        self.record("delete");
        match self.store.lock().unwrap().remove(handle.id()) {
            Some(_) => Ok(()),
            None => Err(RemoteError::new(NOT_FOUND, "no such widget")),
        }
    }
}

impl ResourceKind for Widgets {
    type Config = WidgetConfig;

    fn kind(&self) -> &'static str {
        "widget"
    }

    fn statuses(&self) -> &'static [Status] {
        &[Status::InProgress, Status::Active]
    }

    fn handle(&self, config: &WidgetConfig) -> ResourceHandle {
        ResourceHandle::new(&config.name)
    }

    fn validate(&self, config: &WidgetConfig) -> Result<()> {
        if config.name.is_empty() {
            return Err(Error::precondition(self.kind(), "name must not be empty"));
        }
        Ok(())
    }

    fn create_retry(&self, _config: &WidgetConfig) -> Option<RetryPolicy> {
        self.retry.clone()
    }

    fn activation(&self, _config: &WidgetConfig) -> Option<PollSpec> {
        (self.activation_probes > 0).then(|| {
            PollSpec::creation(
                &[Status::InProgress],
                &[Status::Active],
                Duration::from_secs(60),
            )
            .with_interval(Duration::from_secs(1))
        })
    }

    fn describe(&self, handle: &ResourceHandle) -> std::result::Result<Observation, RemoteError> {
        self.record("describe");
        let mut store = self.store.lock().unwrap();
        let stored = store
            .get_mut(handle.id())
            .ok_or_else(|| RemoteError::new(NOT_FOUND, "no such widget"))?;
        if stored.pending_probes > 0 {
            stored.pending_probes -= 1;
            Ok(Observation::new(Status::InProgress))
        } else {
            Ok(Observation::new(Status::Active))
        }
    }

    fn create(&self, config: &WidgetConfig) -> std::result::Result<ResourceHandle, RemoteError> {
        self.record("create");
        {
            let mut failures = self.transient_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(RemoteError::new(
                    "InvalidRequestException",
                    "The role cannot be assumed by the service",
                ));
            }
        }
        let mut store = self.store.lock().unwrap();
        if store.contains_key(&config.name) {
            return Err(RemoteError::new(ALREADY_EXISTS, "widget exists"));
        }
        store.insert(
            config.name.clone(),
            Stored {
                size: config.size,
                pending_probes: self.activation_probes,
            },
        );
        Ok(ResourceHandle::new(&config.name).with_arn(format!("arn:widget/{}", config.name)))
    }

    fn update(
        &self,
        handle: &ResourceHandle,
        config: &WidgetConfig,
    ) -> std::result::Result<bool, RemoteError> {
        self.record("update");
        let mut store = self.store.lock().unwrap();
        let stored = store
            .get_mut(handle.id())
            .ok_or_else(|| RemoteError::new(NOT_FOUND, "no such widget"))?;
        if stored.size == config.size {
            return Ok(false);
        }
        stored.size = config.size;
        stored.pending_probes = self.activation_probes;
        Ok(true)
    }

    fn teardown_plan(&self, _handle: &ResourceHandle) -> TeardownPlan<'_> {
        TeardownPlan::direct(remote_call(|h: &ResourceHandle| self.remove(h)))
    }
}
