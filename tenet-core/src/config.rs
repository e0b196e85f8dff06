//! Engine configuration
//!
//! Loaded from TOML and optionally overlaid from `TENET_*` environment
//! variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{ConfigError, ConfigResult};

/// What to do when a `when` guard fails to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardFailurePolicy {
    /// Skip the guarded rule and log a warning
    #[default]
    Skip,
    /// Fail the operation
    Reject,
}

impl std::str::FromStr for GuardFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(GuardFailurePolicy::Skip),
            "reject" => Ok(GuardFailurePolicy::Reject),
            _ => Err(ConfigError::InvalidValue {
                field: "guards.on_error".to_string(),
                value: s.to_string(),
                reason: "expected 'skip' or 'reject'".to_string(),
            }),
        }
    }
}

/// Warning acknowledgment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgmentConfig {
    /// HMAC key used to sign tokens
    #[serde(default)]
    pub secret: Option<String>,
    /// Token lifetime in seconds
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: i64,
}

fn default_ttl_seconds() -> i64 {
    300
}

impl Default for AcknowledgmentConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

/// Guard evaluation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub on_error: GuardFailurePolicy,
}

/// Master configuration struct.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub acknowledgment: AcknowledgmentConfig,
    #[serde(default)]
    pub guards: GuardConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: EngineConfig = toml::from_str(text).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Overlay values from `TENET_ACK_SECRET`, `TENET_ACK_TTL_SECONDS` and
    /// `TENET_GUARD_ON_ERROR`.
    pub fn apply_env(self) -> ConfigResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable source.
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<Self> {
        if let Some(secret) = lookup("TENET_ACK_SECRET") {
            self.acknowledgment.secret = Some(secret);
        }
        if let Some(ttl) = lookup("TENET_ACK_TTL_SECONDS") {
            self.acknowledgment.ttl_seconds =
                ttl.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: "acknowledgment.ttl_seconds".to_string(),
                    value: ttl.clone(),
                    reason: "not an integer".to_string(),
                })?;
        }
        if let Some(policy) = lookup("TENET_GUARD_ON_ERROR") {
            self.guards.on_error = policy.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.acknowledgment.ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "acknowledgment.ttl_seconds".to_string(),
                value: self.acknowledgment.ttl_seconds.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if matches!(&self.acknowledgment.secret, Some(s) if s.is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "acknowledgment.secret".to_string(),
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// The acknowledgment secret, required to issue tokens.
    pub fn require_secret(&self) -> ConfigResult<&str> {
        self.acknowledgment
            .secret
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "acknowledgment.secret".to_string(),
            })
    }
}
