use crate::backend::sandbox::Behavior;
use crate::resource::{Policies, patterns};
use anyhow::{Context, Result, bail};
use converge::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("ctlplane"))
}

/// Default settings file location
pub fn default_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

// ============================================================================
// Settings
// ============================================================================

/// Contents of `config.toml`. Every value has a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub sandbox: SandboxSettings,
    pub timeouts: TimeoutSettings,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxSettings {
    pub state_file: String,
    pub account: String,
    pub region: String,
    pub propagation_delay_secs: u64,
    pub activation_delay_secs: u64,
    pub deletion_delay_secs: u64,
    pub deprecation_window_secs: u64,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            state_file: "~/.local/state/ctlplane/sandbox.json".to_string(),
            account: "123456789012".to_string(),
            region: "us-east-1".to_string(),
            propagation_delay_secs: 8,
            activation_delay_secs: 15,
            deletion_delay_secs: 10,
            deprecation_window_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutSettings {
    /// Activation poll after create or update
    pub create_secs: u64,
    /// Deletion poll
    pub delete_secs: u64,
    /// Default for `ctlplane wait`
    pub wait_secs: u64,
    pub poll_interval_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            create_secs: 300,
            delete_secs: 300,
            wait_secs: 300,
            poll_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Interval between attempts while IAM propagates a role
    pub interval_secs: u64,
    pub budget_secs: u64,
    /// Interval between thing type delete attempts after deprecation
    pub deprecation_interval_secs: u64,
    pub deprecation_budget_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            budget_secs: 30,
            deprecation_interval_secs: 10,
            deprecation_budget_secs: 360,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or the default location when `None`.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_path()?,
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Reject values that would make a wait spin
    fn validate(&self) -> Result<()> {
        let intervals = [
            ("timeouts.poll_interval_secs", self.timeouts.poll_interval_secs),
            ("retry.interval_secs", self.retry.interval_secs),
            ("retry.deprecation_interval_secs", self.retry.deprecation_interval_secs),
        ];
        for (key, secs) in intervals {
            if secs == 0 {
                bail!("{key} must be at least 1 second");
            }
        }
        Ok(())
    }

    /// Expanded sandbox state file path
    pub fn state_file(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.sandbox.state_file);
        PathBuf::from(expanded.as_ref())
    }

    pub fn behavior(&self) -> Behavior {
        let s = &self.sandbox;
        Behavior {
            account: s.account.clone(),
            region: s.region.clone(),
            propagation_delay: Duration::from_secs(s.propagation_delay_secs),
            activation_delay: Duration::from_secs(s.activation_delay_secs),
            deletion_delay: Duration::from_secs(s.deletion_delay_secs),
            deprecation_window: Duration::from_secs(s.deprecation_window_secs),
        }
    }

    pub fn policies(&self) -> Policies {
        let r = &self.retry;
        let t = &self.timeouts;
        Policies {
            propagation: RetryPolicy::new(
                Duration::from_secs(r.interval_secs),
                Duration::from_secs(r.budget_secs),
                &[patterns::ROLE_NOT_ASSUMABLE, patterns::TRY_AGAIN],
            ),
            deprecation: RetryPolicy::new(
                Duration::from_secs(r.deprecation_interval_secs),
                Duration::from_secs(r.deprecation_budget_secs),
                &[patterns::WAIT_AFTER_DEPRECATION],
            ),
            create_timeout: Duration::from_secs(t.create_secs),
            delete_timeout: Duration::from_secs(t.delete_secs),
            poll_interval: Duration::from_secs(t.poll_interval_secs),
        }
    }

    /// Default timeout for `ctlplane wait`
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.wait_secs)
    }
}
