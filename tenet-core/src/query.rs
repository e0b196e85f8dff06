//! Query capability consumed by validators and query functions.
//!
//! The engine never reads storage directly. Anything that needs existing
//! data goes through this trait, which the embedding application
//! implements over its own persistence layer.

use async_trait::async_trait;

use crate::{Filter, QueryResult, Record};

/// Asynchronous read access to stored records.
///
/// `tenant_id` scopes the lookup to one tenant; `None` means unscoped.
#[async_trait]
pub trait QueryCapability: Send + Sync {
    /// Records of `entity` matching `filter`.
    async fn query(
        &self,
        entity: &str,
        filter: &Filter,
        tenant_id: Option<&str>,
    ) -> QueryResult<Vec<Record>>;

    /// Whether any record matches.
    async fn exists(
        &self,
        entity: &str,
        filter: &Filter,
        tenant_id: Option<&str>,
    ) -> QueryResult<bool> {
        Ok(!self.query(entity, filter, tenant_id).await?.is_empty())
    }

    /// Number of matching records.
    async fn count(
        &self,
        entity: &str,
        filter: &Filter,
        tenant_id: Option<&str>,
    ) -> QueryResult<u64> {
        Ok(self.query(entity, filter, tenant_id).await?.len() as u64)
    }
}
