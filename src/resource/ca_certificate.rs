//! CA certificate registration
//!
//! Certificates are identified by a hash of their PEM. An active
//! certificate refuses deletion and is deactivated first.

use super::{Activation, Env};
use crate::backend::{ResourceType, Transition, certificate_id};
use converge::{
    Error, Observation, RemoteError, ResourceHandle, ResourceKind, Result, Status, TeardownPlan,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const KIND: &str = "ca_certificate";

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaCertificateConfig {
    pub certificate_pem: String,
    #[serde(default)]
    pub status: Activation,
    /// Register device certificates signed by this CA on first connect
    #[serde(default)]
    pub auto_registration: bool,
}

pub struct CaCertificates {
    env: Arc<Env>,
}

impl CaCertificates {
    pub fn new(env: Arc<Env>) -> Self {
        Self { env }
    }
}

impl ResourceKind for CaCertificates {
    type Config = CaCertificateConfig;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn statuses(&self) -> &'static [Status] {
        &[
            Status::Active,
            Status::Inactive,
            Status::PendingTransfer,
            Status::RegisterInactive,
        ]
    }

    fn handle(&self, config: &CaCertificateConfig) -> ResourceHandle {
        ResourceHandle::new(certificate_id(&config.certificate_pem))
    }

    fn validate(&self, config: &CaCertificateConfig) -> Result<()> {
        super::check_attributes(KIND, config)?;
        let pem = config.certificate_pem.trim();
        if !pem.starts_with(PEM_BEGIN) || !pem.ends_with(PEM_END) {
            return Err(Error::precondition(
                KIND,
                "certificate_pem is not a PEM encoded certificate",
            ));
        }
        if config.auto_registration && config.status == Activation::Inactive {
            return Err(Error::precondition(
                KIND,
                "auto_registration requires an ACTIVE certificate",
            ));
        }
        Ok(())
    }

    fn describe(&self, handle: &ResourceHandle) -> std::result::Result<Observation, RemoteError> {
        self.env.describe(ResourceType::CaCertificate, handle)
    }

    fn create(
        &self,
        config: &CaCertificateConfig,
    ) -> std::result::Result<ResourceHandle, RemoteError> {
        let id = certificate_id(&config.certificate_pem);
        self.env.create(ResourceType::CaCertificate, &id, config)
    }

    fn update(
        &self,
        handle: &ResourceHandle,
        config: &CaCertificateConfig,
    ) -> std::result::Result<bool, RemoteError> {
        self.env.update(ResourceType::CaCertificate, handle, config)
    }

    fn teardown_plan(&self, _handle: &ResourceHandle) -> TeardownPlan<'_> {
        TeardownPlan::deactivate_then_delete(
            |obs: &Observation| obs.status == Status::Active,
            self.env
                .transition_call(ResourceType::CaCertificate, Transition::Deactivate),
            self.env.delete_call(ResourceType::CaCertificate),
        )
    }
}
