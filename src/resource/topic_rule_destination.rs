//! Topic rule destination (HTTP endpoint)
//!
//! Creation and enable/disable both pass through IN_PROGRESS while the
//! endpoint is confirmed; deletion passes through DELETING. Both phases are
//! waited out with a poll.

use super::Env;
use crate::backend::ResourceType;
use converge::{
    Error, Observation, PollSpec, RemoteError, ResourceHandle, ResourceKind, Result, Status,
    TeardownPlan, TeardownStep,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const KIND: &str = "topic_rule_destination";

const fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicRuleDestinationConfig {
    pub name: String,
    pub endpoint_url: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl TopicRuleDestinationConfig {
    /// Status the destination settles in once confirmed
    pub fn target(&self) -> Status {
        if self.enabled {
            Status::Enabled
        } else {
            Status::Disabled
        }
    }
}

pub struct TopicRuleDestinations {
    env: Arc<Env>,
}

impl TopicRuleDestinations {
    pub fn new(env: Arc<Env>) -> Self {
        Self { env }
    }
}

impl ResourceKind for TopicRuleDestinations {
    type Config = TopicRuleDestinationConfig;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn statuses(&self) -> &'static [Status] {
        &[
            Status::InProgress,
            Status::Enabled,
            Status::Disabled,
            Status::Error,
            Status::Deleting,
        ]
    }

    fn handle(&self, config: &TopicRuleDestinationConfig) -> ResourceHandle {
        ResourceHandle::new(&config.name)
    }

    fn validate(&self, config: &TopicRuleDestinationConfig) -> Result<()> {
        super::check_attributes(KIND, config)?;
        if !config.endpoint_url.starts_with("https://") {
            return Err(Error::precondition(
                KIND,
                format!("endpoint_url {} must use https", config.endpoint_url),
            ));
        }
        Ok(())
    }

    fn activation(&self, config: &TopicRuleDestinationConfig) -> Option<PollSpec> {
        let policies = &self.env.policies;
        Some(
            PollSpec::creation(&[Status::InProgress], &[config.target()], policies.create_timeout)
                .with_interval(policies.poll_interval),
        )
    }

    fn describe(&self, handle: &ResourceHandle) -> std::result::Result<Observation, RemoteError> {
        self.env.describe(ResourceType::TopicRuleDestination, handle)
    }

    fn create(
        &self,
        config: &TopicRuleDestinationConfig,
    ) -> std::result::Result<ResourceHandle, RemoteError> {
        self.env
            .create(ResourceType::TopicRuleDestination, &config.name, config)
    }

    fn update(
        &self,
        handle: &ResourceHandle,
        config: &TopicRuleDestinationConfig,
    ) -> std::result::Result<bool, RemoteError> {
        self.env
            .update(ResourceType::TopicRuleDestination, handle, config)
    }

    fn teardown_plan(&self, _handle: &ResourceHandle) -> TeardownPlan<'_> {
        let policies = &self.env.policies;
        TeardownPlan::new().step(
            TeardownStep::new(
                "delete",
                self.env.delete_call(ResourceType::TopicRuleDestination),
            )
            .settle(
                PollSpec::deletion(&[Status::Deleting], policies.delete_timeout)
                    .with_interval(policies.poll_interval),
            ),
        )
    }
}
