//! Thing type
//!
//! Deleting a thing type is a two-phase affair: it must be deprecated, and
//! the remote then refuses the delete for five minutes. Teardown deprecates
//! when needed, retries the delete through the window and makes one final
//! attempt when the retry budget runs out.

use super::Env;
use crate::backend::{ResourceType, Transition};
use converge::{
    Error, Observation, RemoteError, ResourceHandle, ResourceKind, Result, Status, TeardownPlan,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const KIND: &str = "thing_type";

/// Searchable attributes a thing type may declare
pub const MAX_SEARCHABLE_ATTRIBUTES: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThingTypeConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub searchable_attributes: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
}

pub struct ThingTypes {
    env: Arc<Env>,
}

impl ThingTypes {
    pub fn new(env: Arc<Env>) -> Self {
        Self { env }
    }

    fn transition(
        &self,
        handle: &ResourceHandle,
        transition: Transition,
    ) -> std::result::Result<(), RemoteError> {
        log::debug!("{KIND}: {transition} {handle}");
        self.env
            .plane
            .transition(ResourceType::ThingType, handle.id(), transition)
            .map(|_| ())
    }
}

impl ResourceKind for ThingTypes {
    type Config = ThingTypeConfig;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn statuses(&self) -> &'static [Status] {
        &[Status::Active, Status::Deprecated]
    }

    fn handle(&self, config: &ThingTypeConfig) -> ResourceHandle {
        ResourceHandle::new(&config.name)
    }

    fn validate(&self, config: &ThingTypeConfig) -> Result<()> {
        super::check_attributes(KIND, config)?;
        if config.searchable_attributes.len() > MAX_SEARCHABLE_ATTRIBUTES {
            return Err(Error::precondition(
                KIND,
                format!(
                    "at most {MAX_SEARCHABLE_ATTRIBUTES} searchable attributes are allowed, got {}",
                    config.searchable_attributes.len()
                ),
            ));
        }
        Ok(())
    }

    fn describe(&self, handle: &ResourceHandle) -> std::result::Result<Observation, RemoteError> {
        self.env.describe(ResourceType::ThingType, handle)
    }

    fn create(&self, config: &ThingTypeConfig) -> std::result::Result<ResourceHandle, RemoteError> {
        let handle = self.env.create(ResourceType::ThingType, &config.name, config)?;
        if config.deprecated {
            self.transition(&handle, Transition::Deprecate)?;
        }
        Ok(handle)
    }

    /// Attributes are replaced; deprecation is driven by a transition
    fn update(
        &self,
        handle: &ResourceHandle,
        config: &ThingTypeConfig,
    ) -> std::result::Result<bool, RemoteError> {
        let mut changed = self.env.update(ResourceType::ThingType, handle, config)?;

        let current = self.env.plane.describe(ResourceType::ThingType, handle.id())?;
        let deprecated = current.status == Status::Deprecated;
        if config.deprecated != deprecated {
            let transition = if config.deprecated {
                Transition::Deprecate
            } else {
                Transition::Undeprecate
            };
            self.transition(handle, transition)?;
            changed = true;
        }
        Ok(changed)
    }

    fn teardown_plan(&self, _handle: &ResourceHandle) -> TeardownPlan<'_> {
        TeardownPlan::deprecate_then_delete(
            |obs: &Observation| obs.status != Status::Deprecated,
            self.env
                .transition_call(ResourceType::ThingType, Transition::Deprecate),
            self.env.policies.deprecation.clone(),
            self.env.delete_call(ResourceType::ThingType),
        )
    }
}
