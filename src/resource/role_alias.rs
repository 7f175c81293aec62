//! Role alias - credential provider entry pointing at an IAM role
//!
//! A freshly created role is not assumable by IoT until IAM propagates it,
//! so create and update retry while the remote says so.

use super::Env;
use crate::backend::ResourceType;
use converge::{
    Error, Observation, RemoteError, ResourceHandle, ResourceKind, Result, RetryPolicy, Status,
    TeardownPlan,
};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::Arc;

pub const KIND: &str = "role_alias";

/// Credential lifetime accepted by the credential provider
pub const CREDENTIAL_DURATION: RangeInclusive<u32> = 900..=43_200;

fn default_credential_duration() -> u32 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleAliasConfig {
    pub alias: String,
    pub role_arn: String,
    #[serde(default = "default_credential_duration")]
    pub credential_duration_seconds: u32,
}

pub struct RoleAliases {
    env: Arc<Env>,
}

impl RoleAliases {
    pub fn new(env: Arc<Env>) -> Self {
        Self { env }
    }

    /// Retry while IAM has not propagated the role yet
    fn propagation(&self) -> RetryPolicy {
        self.env.policies.propagation.clone()
    }
}

impl ResourceKind for RoleAliases {
    type Config = RoleAliasConfig;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn statuses(&self) -> &'static [Status] {
        &[Status::Active]
    }

    fn handle(&self, config: &RoleAliasConfig) -> ResourceHandle {
        ResourceHandle::new(&config.alias)
    }

    fn validate(&self, config: &RoleAliasConfig) -> Result<()> {
        super::check_attributes(KIND, config)?;
        if !CREDENTIAL_DURATION.contains(&config.credential_duration_seconds) {
            return Err(Error::precondition(
                KIND,
                format!(
                    "credential_duration_seconds must be between {} and {}, got {}",
                    CREDENTIAL_DURATION.start(),
                    CREDENTIAL_DURATION.end(),
                    config.credential_duration_seconds
                ),
            ));
        }
        if !config.role_arn.contains(":role/") {
            return Err(Error::precondition(
                KIND,
                format!("role_arn {} is not an IAM role ARN", config.role_arn),
            ));
        }
        Ok(())
    }

    fn create_retry(&self, _config: &RoleAliasConfig) -> Option<RetryPolicy> {
        Some(self.propagation())
    }

    fn update_retry(&self, _config: &RoleAliasConfig) -> Option<RetryPolicy> {
        Some(self.propagation())
    }

    fn describe(&self, handle: &ResourceHandle) -> std::result::Result<Observation, RemoteError> {
        self.env.describe(ResourceType::RoleAlias, handle)
    }

    fn create(&self, config: &RoleAliasConfig) -> std::result::Result<ResourceHandle, RemoteError> {
        self.env.create(ResourceType::RoleAlias, &config.alias, config)
    }

    fn update(
        &self,
        handle: &ResourceHandle,
        config: &RoleAliasConfig,
    ) -> std::result::Result<bool, RemoteError> {
        self.env.update(ResourceType::RoleAlias, handle, config)
    }

    fn teardown_plan(&self, _handle: &ResourceHandle) -> TeardownPlan<'_> {
        TeardownPlan::direct(self.env.delete_call(ResourceType::RoleAlias))
    }
}
