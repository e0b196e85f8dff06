//! Caller identity

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Value;

/// Identity of the caller performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub tenant_id: String,
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserContext {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Object exposed to expressions as the `context` variable.
    pub fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("userId".to_string(), Value::from(self.user_id.as_str()));
        map.insert("tenantId".to_string(), Value::from(self.tenant_id.as_str()));
        map.insert(
            "roles".to_string(),
            Value::Array(self.roles.iter().map(|r| Value::from(r.as_str())).collect()),
        );
        Value::Object(map)
    }
}
