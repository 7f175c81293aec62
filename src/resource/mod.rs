//! IoT control-plane resource kinds
//!
//! Every kind implements [`converge::ResourceKind`] over the shared
//! [`ControlPlane`] client held in an [`Env`]:
//! - Thin CRUD calls mapped onto the control plane
//! - The waiting policy the kind needs (retry, activation poll, teardown plan)
//! - Validation of configuration combinations the remote would refuse

pub mod authorizer;
pub mod ca_certificate;
pub mod role;
pub mod role_alias;
pub mod thing;
pub mod thing_type;
pub mod topic_rule_destination;

use crate::backend::{
    Attributes, AwsClassifier, ControlPlane, Record, ResourceType, Transition, codes, to_attributes,
};
use converge::{
    DynReconcile, Observation, Orchestrator, Registry, RemoteCall, RemoteError, ResourceHandle,
    RetryPolicy, remote_call,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub use authorizer::{AuthorizerConfig, Authorizers};
pub use ca_certificate::{CaCertificateConfig, CaCertificates};
pub use role::{RoleConfig, Roles};
pub use role_alias::{RoleAliasConfig, RoleAliases};
pub use thing::{ThingConfig, Things};
pub use thing_type::{ThingTypeConfig, ThingTypes};
pub use topic_rule_destination::{TopicRuleDestinationConfig, TopicRuleDestinations};

/// Error substrings that mark a remote failure as transient
pub mod patterns {
    /// IAM role not yet visible to IoT
    pub const ROLE_NOT_ASSUMABLE: &str = "cannot be assumed";
    pub const TRY_AGAIN: &str = "try again in a few seconds";
    /// Thing type deleted too soon after deprecation
    pub const WAIT_AFTER_DEPRECATION: &str = "wait for 5 minutes after deprecation";
}

/// Reconcile order: kinds in a later tier reference kinds in an earlier one
pub const TIERS: [&[&str]; 2] = [
    &[
        role::KIND,
        thing_type::KIND,
        ca_certificate::KIND,
        topic_rule_destination::KIND,
        authorizer::KIND,
    ],
    &[role_alias::KIND, thing::KIND],
];

/// Dependency tier of `kind`; unknown kinds go last
pub fn tier(kind: &str) -> usize {
    TIERS
        .iter()
        .position(|kinds| kinds.contains(&kind))
        .unwrap_or(TIERS.len())
}

/// Desired activation state of authorizers and CA certificates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Activation {
    #[default]
    Active,
    Inactive,
}

/// Retry budgets and poll timeouts shared by every kind
#[derive(Debug, Clone)]
pub struct Policies {
    /// Retry around creates that race IAM propagation
    pub propagation: RetryPolicy,
    /// Retry around thing type deletes inside the deprecation window
    pub deprecation: RetryPolicy,
    /// Activation poll timeout after create or update
    pub create_timeout: Duration,
    /// Deletion poll timeout
    pub delete_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            propagation: RetryPolicy::new(
                Duration::from_secs(1),
                Duration::from_secs(30),
                &[patterns::ROLE_NOT_ASSUMABLE, patterns::TRY_AGAIN],
            ),
            deprecation: RetryPolicy::new(
                Duration::from_secs(10),
                Duration::from_secs(360),
                &[patterns::WAIT_AFTER_DEPRECATION],
            ),
            create_timeout: Duration::from_secs(300),
            delete_timeout: Duration::from_secs(300),
            poll_interval: converge::DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Shared client handed to every kind
pub struct Env {
    pub plane: Arc<dyn ControlPlane>,
    pub policies: Policies,
}

impl Env {
    pub fn new(plane: Arc<dyn ControlPlane>, policies: Policies) -> Self {
        Self { plane, policies }
    }

    fn describe(&self, kind: ResourceType, handle: &ResourceHandle) -> Result<Observation, RemoteError> {
        self.plane
            .describe(kind, handle.id())
            .map(|record| Observation::from(&record))
    }

    fn create<T: Serialize>(
        &self,
        kind: ResourceType,
        id: &str,
        config: &T,
    ) -> Result<ResourceHandle, RemoteError> {
        let attributes = to_attributes(config).map_err(unencodable)?;
        self.plane.create(kind, id, attributes).map(handle_of)
    }

    fn update<T: Serialize>(
        &self,
        kind: ResourceType,
        handle: &ResourceHandle,
        config: &T,
    ) -> Result<bool, RemoteError> {
        let attributes = to_attributes(config).map_err(unencodable)?;
        self.plane.update(kind, handle.id(), attributes)
    }

    fn delete_call(&self, kind: ResourceType) -> RemoteCall<'_> {
        remote_call(move |handle: &ResourceHandle| self.plane.delete(kind, handle.id()))
    }

    fn transition_call(&self, kind: ResourceType, transition: Transition) -> RemoteCall<'_> {
        remote_call(move |handle: &ResourceHandle| {
            self.plane
                .transition(kind, handle.id(), transition)
                .map(|_| ())
        })
    }
}

/// Attribute bag for `config`; a config that does not encode is a
/// configuration error, caught before any remote call
fn check_attributes<T: Serialize>(
    kind: &'static str,
    config: &T,
) -> converge::Result<Attributes> {
    to_attributes(config).map_err(|source| converge::Error::Config {
        kind: kind.to_string(),
        source,
    })
}

fn unencodable(e: serde_json::Error) -> RemoteError {
    RemoteError::new(codes::INVALID_REQUEST, format!("Invalid attributes: {e}"))
}

fn handle_of(record: Record) -> ResourceHandle {
    ResourceHandle::new(record.id).with_arn(record.arn)
}

/// Every kind, keyed by name
pub fn registry() -> Registry<Env> {
    Registry::<Env>::new()
        .with(role::KIND, |env| Box::new(Roles::new(env)) as Box<dyn DynReconcile>)
        .with(role_alias::KIND, |env| {
            Box::new(RoleAliases::new(env)) as Box<dyn DynReconcile>
        })
        .with(authorizer::KIND, |env| {
            Box::new(Authorizers::new(env)) as Box<dyn DynReconcile>
        })
        .with(ca_certificate::KIND, |env| {
            Box::new(CaCertificates::new(env)) as Box<dyn DynReconcile>
        })
        .with(thing_type::KIND, |env| {
            Box::new(ThingTypes::new(env)) as Box<dyn DynReconcile>
        })
        .with(topic_rule_destination::KIND, |env| {
            Box::new(TopicRuleDestinations::new(env)) as Box<dyn DynReconcile>
        })
        .with(thing::KIND, |env| Box::new(Things::new(env)) as Box<dyn DynReconcile>)
}

/// Orchestrator over every kind, classifying errors by AWS code
pub fn orchestrator(env: Env) -> Orchestrator<Env> {
    let poll_interval = env.policies.poll_interval;
    Orchestrator::new(registry(), Arc::new(env), Arc::new(AwsClassifier))
        .with_poll_interval(poll_interval)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{Env, Policies};
    use crate::backend::sandbox::testing::on_clock;
    use crate::backend::sandbox::{Behavior, Sandbox};
    use converge::{ManualClock, WaitContext};
    use std::sync::Arc;

    /// Sandbox, kinds and waits all running on one virtual clock
    pub struct Harness {
        pub clock: ManualClock,
        pub ctx: WaitContext,
        pub sandbox: Arc<Sandbox>,
        pub env: Arc<Env>,
    }

    pub fn harness() -> Harness {
        let clock = ManualClock::new();
        let sandbox = Arc::new(on_clock(&clock, Behavior::default()));
        let env = Arc::new(Env::new(sandbox.clone(), Policies::default()));
        let ctx = WaitContext::with_clock(Arc::new(clock.clone()));
        Harness {
            clock,
            ctx,
            sandbox,
            env,
        }
    }
}
