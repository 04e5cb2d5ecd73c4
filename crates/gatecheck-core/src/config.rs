//! Engine configuration
//!
//! Loaded from YAML, with environment overrides:
//!
//! ```yaml
//! monetary_tolerance: 0.01
//! builtin_catalog: true
//! rule_set_dirs:
//!   - /etc/gatecheck/rulesets
//! log_filter: "info,gatecheck_rules=debug"
//! ```

use crate::context::DEFAULT_MONETARY_TOLERANCE;
use crate::error::GatecheckError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_TOLERANCE: &str = "GATECHECK_TOLERANCE";
pub const ENV_RULESETS: &str = "GATECHECK_RULESETS";
pub const ENV_LOG: &str = "GATECHECK_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tolerance for monetary equality checks
    #[serde(default = "default_tolerance")]
    pub monetary_tolerance: f64,

    /// Directories scanned for `*.yaml` / `*.yml` rule sets
    #[serde(default)]
    pub rule_set_dirs: Vec<PathBuf>,

    /// Whether the embedded catalog is registered
    #[serde(default = "default_true")]
    pub builtin_catalog: bool,

    /// `tracing-subscriber` env-filter directive
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_tolerance() -> f64 {
    DEFAULT_MONETARY_TOLERANCE
}

fn default_true() -> bool {
    true
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            monetary_tolerance: default_tolerance(),
            rule_set_dirs: Vec::new(),
            builtin_catalog: true,
            log_filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    /// Load a YAML config file, apply environment overrides, and validate.
    ///
    /// Relative `rule_set_dirs` in the file resolve against the file's
    /// directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GatecheckError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        if let Some(base) = path.parent() {
            config.rule_set_dirs = config
                .rule_set_dirs
                .into_iter()
                .map(|dir| if dir.is_relative() { base.join(dir) } else { dir })
                .collect();
        }
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            monetary_tolerance = config.monetary_tolerance,
            rule_set_dirs = config.rule_set_dirs.len(),
            builtin_catalog = config.builtin_catalog,
            "loaded engine config"
        );
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self, GatecheckError> {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, GatecheckError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable source (the process environment in
    /// `load` / `from_env`)
    pub fn apply_env_overrides<F>(&mut self, var: F) -> Result<(), GatecheckError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = var(ENV_TOLERANCE) {
            self.monetary_tolerance = raw.trim().parse::<f64>().map_err(|_| {
                GatecheckError::Config(format!("{ENV_TOLERANCE} must be a number, got '{raw}'"))
            })?;
        }

        if let Some(raw) = var(ENV_RULESETS) {
            self.rule_set_dirs.extend(
                raw.split(':')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from),
            );
        }

        if let Some(raw) = var(ENV_LOG) {
            if !raw.trim().is_empty() {
                self.log_filter = raw.trim().to_string();
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), GatecheckError> {
        if !self.monetary_tolerance.is_finite() || self.monetary_tolerance < 0.0 {
            return Err(GatecheckError::Config(format!(
                "monetary_tolerance must be a finite, non-negative number (got {})",
                self.monetary_tolerance
            )));
        }
        Ok(())
    }
}
