//! Thing registry entry

use super::Env;
use crate::backend::ResourceType;
use converge::{Observation, RemoteError, ResourceHandle, ResourceKind, Status, TeardownPlan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const KIND: &str = "thing";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThingConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thing_type_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

pub struct Things {
    env: Arc<Env>,
}

impl Things {
    pub fn new(env: Arc<Env>) -> Self {
        Self { env }
    }
}

impl ResourceKind for Things {
    type Config = ThingConfig;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn statuses(&self) -> &'static [Status] {
        &[Status::Active]
    }

    fn handle(&self, config: &ThingConfig) -> ResourceHandle {
        ResourceHandle::new(&config.name)
    }

    fn validate(&self, config: &ThingConfig) -> converge::Result<()> {
        super::check_attributes(KIND, config).map(|_| ())
    }

    fn describe(&self, handle: &ResourceHandle) -> Result<Observation, RemoteError> {
        self.env.describe(ResourceType::Thing, handle)
    }

    fn create(&self, config: &ThingConfig) -> Result<ResourceHandle, RemoteError> {
        self.env.create(ResourceType::Thing, &config.name, config)
    }

    fn update(&self, handle: &ResourceHandle, config: &ThingConfig) -> Result<bool, RemoteError> {
        self.env.update(ResourceType::Thing, handle, config)
    }

    fn teardown_plan(&self, _handle: &ResourceHandle) -> TeardownPlan<'_> {
        TeardownPlan::direct(self.env.delete_call(ResourceType::Thing))
    }
}
