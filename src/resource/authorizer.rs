//! Custom authorizer
//!
//! An active authorizer refuses deletion, so teardown deactivates it first
//! when the probe still reports ACTIVE.

use super::{Activation, Env};
use crate::backend::{ResourceType, Transition};
use converge::{
    Error, Observation, RemoteError, ResourceHandle, ResourceKind, Result, Status, TeardownPlan,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const KIND: &str = "authorizer";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorizerConfig {
    pub name: String,
    pub authorizer_function_arn: String,
    /// Header carrying the signed token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_key_name: Option<String>,
    /// Key name → PEM public key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub token_signing_public_keys: BTreeMap<String, String>,
    #[serde(default)]
    pub signing_disabled: bool,
    #[serde(default)]
    pub status: Activation,
}

pub struct Authorizers {
    env: Arc<Env>,
}

impl Authorizers {
    pub fn new(env: Arc<Env>) -> Self {
        Self { env }
    }
}

impl ResourceKind for Authorizers {
    type Config = AuthorizerConfig;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn statuses(&self) -> &'static [Status] {
        &[Status::Active, Status::Inactive]
    }

    fn handle(&self, config: &AuthorizerConfig) -> ResourceHandle {
        ResourceHandle::new(&config.name)
    }

    fn validate(&self, config: &AuthorizerConfig) -> Result<()> {
        super::check_attributes(KIND, config)?;
        if config.signing_disabled {
            return Ok(());
        }
        if config.token_key_name.as_deref().is_none_or(str::is_empty) {
            return Err(Error::precondition(
                KIND,
                "token_key_name is required unless signing_disabled is set",
            ));
        }
        if config.token_signing_public_keys.is_empty() {
            return Err(Error::precondition(
                KIND,
                "token_signing_public_keys is required unless signing_disabled is set",
            ));
        }
        Ok(())
    }

    fn describe(&self, handle: &ResourceHandle) -> std::result::Result<Observation, RemoteError> {
        self.env.describe(ResourceType::Authorizer, handle)
    }

    fn create(&self, config: &AuthorizerConfig) -> std::result::Result<ResourceHandle, RemoteError> {
        self.env.create(ResourceType::Authorizer, &config.name, config)
    }

    fn update(
        &self,
        handle: &ResourceHandle,
        config: &AuthorizerConfig,
    ) -> std::result::Result<bool, RemoteError> {
        self.env.update(ResourceType::Authorizer, handle, config)
    }

    fn teardown_plan(&self, _handle: &ResourceHandle) -> TeardownPlan<'_> {
        TeardownPlan::deactivate_then_delete(
            |obs: &Observation| obs.status == Status::Active,
            self.env
                .transition_call(ResourceType::Authorizer, Transition::Deactivate),
            self.env.delete_call(ResourceType::Authorizer),
        )
    }
}
