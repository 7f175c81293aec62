//! Desired-state manifest (`ctlplane.toml`)
//!
//! One array of tables per resource kind:
//!
//! ```toml
//! [[role]]
//! name = "iot-access"
//!
//! [[role_alias]]
//! alias = "device-access"
//! role_arn = "arn:aws:iam::123456789012:role/iot-access"
//! ```

use crate::resource::{
    AuthorizerConfig, CaCertificateConfig, RoleAliasConfig, RoleConfig, ThingConfig,
    ThingTypeConfig, TopicRuleDestinationConfig, authorizer, ca_certificate, role, role_alias,
    thing, thing_type, topic_rule_destination,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub role: Vec<RoleConfig>,
    #[serde(default)]
    pub role_alias: Vec<RoleAliasConfig>,
    #[serde(default)]
    pub authorizer: Vec<AuthorizerConfig>,
    #[serde(default)]
    pub ca_certificate: Vec<CaCertificateConfig>,
    #[serde(default)]
    pub thing_type: Vec<ThingTypeConfig>,
    #[serde(default)]
    pub topic_rule_destination: Vec<TopicRuleDestinationConfig>,
    #[serde(default)]
    pub thing: Vec<ThingConfig>,
}

/// One manifest entry in the untyped form the orchestrator takes
#[derive(Debug, Clone)]
pub struct Entry {
    pub kind: &'static str,
    pub config: Value,
}

fn push_all<T: Serialize>(entries: &mut Vec<Entry>, kind: &'static str, items: &[T]) -> Result<()> {
    for item in items {
        let config = serde_json::to_value(item)
            .with_context(|| format!("Could not encode {kind} entry"))?;
        entries.push(Entry { kind, config });
    }
    Ok(())
}

impl Manifest {
    /// Load and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Every entry, grouped by kind
    pub fn entries(&self) -> Result<Vec<Entry>> {
        let mut entries = Vec::with_capacity(self.len());
        push_all(&mut entries, role::KIND, &self.role)?;
        push_all(&mut entries, thing_type::KIND, &self.thing_type)?;
        push_all(&mut entries, ca_certificate::KIND, &self.ca_certificate)?;
        push_all(&mut entries, topic_rule_destination::KIND, &self.topic_rule_destination)?;
        push_all(&mut entries, authorizer::KIND, &self.authorizer)?;
        push_all(&mut entries, role_alias::KIND, &self.role_alias)?;
        push_all(&mut entries, thing::KIND, &self.thing)?;
        Ok(entries)
    }

    pub fn len(&self) -> usize {
        self.role.len()
            + self.role_alias.len()
            + self.authorizer.len()
            + self.ca_certificate.len()
            + self.thing_type.len()
            + self.topic_rule_destination.len()
            + self.thing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
