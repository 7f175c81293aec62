//! IAM role that role aliases and topic rules assume

use super::Env;
use crate::backend::ResourceType;
use converge::{
    Observation, RemoteError, ResourceHandle, ResourceKind, Status, TeardownPlan,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const KIND: &str = "role";

fn default_trusted_service() -> String {
    "credentials.iot.amazonaws.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Service principal allowed to assume the role
    #[serde(default = "default_trusted_service")]
    pub trusted_service: String,
}

pub struct Roles {
    env: Arc<Env>,
}

impl Roles {
    pub fn new(env: Arc<Env>) -> Self {
        Self { env }
    }
}

impl ResourceKind for Roles {
    type Config = RoleConfig;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn statuses(&self) -> &'static [Status] {
        &[Status::Active]
    }

    fn handle(&self, config: &RoleConfig) -> ResourceHandle {
        ResourceHandle::new(&config.name)
    }

    fn validate(&self, config: &RoleConfig) -> converge::Result<()> {
        super::check_attributes(KIND, config).map(|_| ())
    }

    fn describe(&self, handle: &ResourceHandle) -> Result<Observation, RemoteError> {
        self.env.describe(ResourceType::Role, handle)
    }

    fn create(&self, config: &RoleConfig) -> Result<ResourceHandle, RemoteError> {
        self.env.create(ResourceType::Role, &config.name, config)
    }

    fn update(&self, handle: &ResourceHandle, config: &RoleConfig) -> Result<bool, RemoteError> {
        self.env.update(ResourceType::Role, handle, config)
    }

    fn teardown_plan(&self, _handle: &ResourceHandle) -> TeardownPlan<'_> {
        TeardownPlan::direct(self.env.delete_call(ResourceType::Role))
    }
}
