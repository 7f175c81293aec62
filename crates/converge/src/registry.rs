//! Factory registry and orchestrator
//!
//! The registry maps kind names to constructors. It is an ordinary value
//! built at startup and handed to the [`Orchestrator`], so separate
//! instances (and parallel tests) never share state. Kinds are constructed
//! fresh for every call and dropped when it returns.

use crate::classify::ErrorClassifier;
use crate::context::WaitContext;
use crate::error::{Error, Result};
use crate::reconcile::{Reconciler, ResourceKind};
use crate::types::{Observation, ReconcileOutcome, ResourceHandle, Status};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Object-safe view of a [`ResourceKind`] taking untyped configs.
///
/// Every [`ResourceKind`] gets this for free; configs are decoded into the
/// kind's typed config here and nowhere deeper.
pub trait DynReconcile: Send + Sync {
    fn kind(&self) -> &'static str;

    fn statuses(&self) -> &'static [Status];

    /// Handle the resource described by `config` would have
    fn handle(&self, config: &Value) -> Result<ResourceHandle>;

    fn create(&self, scope: &Scope<'_>, config: &Value) -> Result<ReconcileOutcome>;

    fn update(
        &self,
        scope: &Scope<'_>,
        handle: &ResourceHandle,
        config: &Value,
    ) -> Result<ReconcileOutcome>;

    fn delete(&self, scope: &Scope<'_>, handle: &ResourceHandle) -> Result<ReconcileOutcome>;

    fn wait_for(
        &self,
        scope: &Scope<'_>,
        handle: &ResourceHandle,
        targets: &[Status],
        timeout: Duration,
    ) -> Result<Observation>;

    fn probe(&self, scope: &Scope<'_>, handle: &ResourceHandle) -> Result<Observation>;

    fn ensure(&self, scope: &Scope<'_>, config: &Value) -> Result<ReconcileOutcome>;
}

/// Per-call wiring handed to a [`DynReconcile`].
pub struct Scope<'a> {
    pub ctx: &'a WaitContext,
    pub classifier: &'a dyn ErrorClassifier,
    pub poll_interval: Duration,
}

impl Scope<'_> {
    fn reconciler<'k, K: ResourceKind>(&'k self, kind: &'k K) -> Reconciler<'k, K> {
        Reconciler::new(kind, self.classifier, self.ctx).with_poll_interval(self.poll_interval)
    }
}

fn decode<K: ResourceKind>(kind: &K, config: &Value) -> Result<K::Config> {
    K::Config::deserialize(config).map_err(|source| Error::Config {
        kind: ResourceKind::kind(kind).to_string(),
        source,
    })
}

impl<K> DynReconcile for K
where
    K: ResourceKind + Send + Sync,
{
    fn kind(&self) -> &'static str {
        ResourceKind::kind(self)
    }

    fn statuses(&self) -> &'static [Status] {
        ResourceKind::statuses(self)
    }

    fn handle(&self, config: &Value) -> Result<ResourceHandle> {
        Ok(ResourceKind::handle(self, &decode(self, config)?))
    }

    fn create(&self, scope: &Scope<'_>, config: &Value) -> Result<ReconcileOutcome> {
        scope.reconciler(self).create(&decode(self, config)?)
    }

    fn update(
        &self,
        scope: &Scope<'_>,
        handle: &ResourceHandle,
        config: &Value,
    ) -> Result<ReconcileOutcome> {
        scope.reconciler(self).update(handle, &decode(self, config)?)
    }

    fn delete(&self, scope: &Scope<'_>, handle: &ResourceHandle) -> Result<ReconcileOutcome> {
        scope.reconciler(self).delete(handle)
    }

    fn wait_for(
        &self,
        scope: &Scope<'_>,
        handle: &ResourceHandle,
        targets: &[Status],
        timeout: Duration,
    ) -> Result<Observation> {
        scope.reconciler(self).wait_for(handle, targets, timeout)
    }

    fn probe(&self, scope: &Scope<'_>, handle: &ResourceHandle) -> Result<Observation> {
        scope.reconciler(self).probe(handle)
    }

    fn ensure(&self, scope: &Scope<'_>, config: &Value) -> Result<ReconcileOutcome> {
        scope.reconciler(self).ensure(&decode(self, config)?)
    }
}

/// Constructor for one kind, given the shared client.
pub type Factory<C> = Box<dyn Fn(Arc<C>) -> Box<dyn DynReconcile> + Send + Sync>;

/// Kind name → constructor.
pub struct Registry<C: ?Sized> {
    factories: BTreeMap<&'static str, Factory<C>>,
}

impl<C: ?Sized> Registry<C> {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register a constructor under `kind`, replacing any previous one
    pub fn register<F>(&mut self, kind: &'static str, factory: F) -> &mut Self
    where
        F: Fn(Arc<C>) -> Box<dyn DynReconcile> + Send + Sync + 'static,
    {
        if self.factories.insert(kind, Box::new(factory)).is_some() {
            log::debug!("replaced factory for {kind}");
        }
        self
    }

    /// Builder-style [`register`](Self::register)
    pub fn with<F>(mut self, kind: &'static str, factory: F) -> Self
    where
        F: Fn(Arc<C>) -> Box<dyn DynReconcile> + Send + Sync + 'static,
    {
        self.register(kind, factory);
        self
    }

    /// Registered kind names, sorted
    pub fn kinds(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Construct the kind registered under `kind`
    pub fn build(&self, kind: &str, client: Arc<C>) -> Result<Box<dyn DynReconcile>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| Error::UnknownKind(kind.to_string()))?;
        Ok(factory(client))
    }
}

impl<C: ?Sized> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatches reconciliation calls by kind name.
///
/// Holds no mutable state; every method builds the kind, runs one
/// operation under the caller's [`WaitContext`] and drops it. Safe to share
/// across threads.
pub struct Orchestrator<C: ?Sized> {
    registry: Registry<C>,
    client: Arc<C>,
    classifier: Arc<dyn ErrorClassifier>,
    poll_interval: Duration,
}

impl<C: ?Sized> Orchestrator<C> {
    pub fn new(registry: Registry<C>, client: Arc<C>, classifier: Arc<dyn ErrorClassifier>) -> Self {
        Self {
            registry,
            client,
            classifier,
            poll_interval: crate::types::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Probe interval for `wait_for`
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.registry.kinds()
    }

    /// Known statuses of `kind`
    pub fn statuses(&self, kind: &str) -> Result<&'static [Status]> {
        Ok(self.build(kind)?.statuses())
    }

    /// Handle the resource described by `config` would have
    pub fn handle(&self, kind: &str, config: &Value) -> Result<ResourceHandle> {
        self.build(kind)?.handle(config)
    }

    pub fn create(&self, ctx: &WaitContext, kind: &str, config: &Value) -> Result<ReconcileOutcome> {
        self.build(kind)?.create(&self.scope(ctx), config)
    }

    pub fn update(
        &self,
        ctx: &WaitContext,
        kind: &str,
        handle: &ResourceHandle,
        config: &Value,
    ) -> Result<ReconcileOutcome> {
        self.build(kind)?.update(&self.scope(ctx), handle, config)
    }

    /// Idempotent delete
    pub fn delete(
        &self,
        ctx: &WaitContext,
        kind: &str,
        handle: &ResourceHandle,
    ) -> Result<ReconcileOutcome> {
        self.build(kind)?.delete(&self.scope(ctx), handle)
    }

    pub fn wait_for(
        &self,
        ctx: &WaitContext,
        kind: &str,
        handle: &ResourceHandle,
        targets: &[Status],
        timeout: Duration,
    ) -> Result<Observation> {
        self.build(kind)?
            .wait_for(&self.scope(ctx), handle, targets, timeout)
    }

    pub fn probe(&self, ctx: &WaitContext, kind: &str, handle: &ResourceHandle) -> Result<Observation> {
        self.build(kind)?.probe(&self.scope(ctx), handle)
    }

    /// Create when absent, update when present
    pub fn ensure(&self, ctx: &WaitContext, kind: &str, config: &Value) -> Result<ReconcileOutcome> {
        self.build(kind)?.ensure(&self.scope(ctx), config)
    }

    fn build(&self, kind: &str) -> Result<Box<dyn DynReconcile>> {
        self.registry.build(kind, Arc::clone(&self.client))
    }

    fn scope<'a>(&'a self, ctx: &'a WaitContext) -> Scope<'a> {
        Scope {
            ctx,
            classifier: self.classifier.as_ref(),
            poll_interval: self.poll_interval,
        }
    }
}
