//! Enum types shared across the engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ConfigError;

/// Record operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            _ => Err(ConfigError::InvalidValue {
                field: "operation".to_string(),
                value: s.to_string(),
                reason: "expected create, update or delete".to_string(),
            }),
        }
    }
}

/// Operations a declaration applies to when it does not say otherwise.
pub fn default_operations() -> Vec<Operation> {
    vec![Operation::Create, Operation::Update]
}

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks the save
    #[default]
    Error,
    /// Requires acknowledgment before the save proceeds
    Warning,
}

/// When a default is allowed to write its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultPolicy {
    /// Only fill a null or blank field
    #[default]
    Default,
    /// Always recompute
    Overwrite,
}

/// Lifecycle point at which hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookPoint {
    BeforeSave,
    AfterSave,
    AfterCommit,
    BeforeDelete,
}

impl HookPoint {
    pub const ALL: [HookPoint; 4] = [
        HookPoint::BeforeSave,
        HookPoint::AfterSave,
        HookPoint::AfterCommit,
        HookPoint::BeforeDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookPoint::BeforeSave => "beforeSave",
            HookPoint::AfterSave => "afterSave",
            HookPoint::AfterCommit => "afterCommit",
            HookPoint::BeforeDelete => "beforeDelete",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookPoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookPoint::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "hook_point".to_string(),
                value: s.to_string(),
                reason: "expected beforeSave, afterSave, afterCommit or beforeDelete".to_string(),
            })
    }
}

/// Tenant partitioning of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityScope {
    #[default]
    Tenant,
    Global,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_point_round_trip() {
        for point in HookPoint::ALL {
            assert_eq!(point.as_str().parse::<HookPoint>().unwrap(), point);
        }
        assert!("beforeUpdate".parse::<HookPoint>().is_err());
    }

    #[test]
    fn test_operation_parse_is_case_insensitive() {
        assert_eq!("UPDATE".parse::<Operation>().unwrap(), Operation::Update);
        assert!("upsert".parse::<Operation>().is_err());
    }

    #[test]
    fn test_severity_serde() {
        let s: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(s, Severity::Warning);
        assert_eq!(Severity::default(), Severity::Error);
    }
}
