//! Hook trait and registry

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::HookServiceResult;
use crate::types::{HookContext, HookResult};

// ============================================================================
// HOOK TRAIT
// ============================================================================

/// Application code run at a lifecycle point.
///
/// Returning `Ok(None)` means "nothing to do". Returning an error fails
/// the operation, except at `afterCommit`.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn run(&self, ctx: &HookContext) -> HookServiceResult<Option<HookResult>>;
}

/// Hook backed by an async closure over an owned context snapshot.
pub struct FnHook<F> {
    f: F,
}

/// Wrap an async closure as a [`Hook`].
pub fn hook_fn<F, Fut>(f: F) -> FnHook<F>
where
    F: Fn(HookContext) -> Fut + Send + Sync,
    Fut: Future<Output = HookServiceResult<Option<HookResult>>> + Send,
{
    FnHook { f }
}

#[async_trait]
impl<F, Fut> Hook for FnHook<F>
where
    F: Fn(HookContext) -> Fut + Send + Sync,
    Fut: Future<Output = HookServiceResult<Option<HookResult>>> + Send,
{
    async fn run(&self, ctx: &HookContext) -> HookServiceResult<Option<HookResult>> {
        (self.f)(ctx.clone()).await
    }
}

// ============================================================================
// HOOK REGISTRY
// ============================================================================

/// Named hooks, populated once at startup and shared read-only afterwards.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn Hook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook. A name that is already taken keeps its first hook
    /// and returns `false`.
    pub fn register(&mut self, name: impl Into<String>, hook: impl Hook + 'static) -> bool {
        self.register_arc(name, Arc::new(hook))
    }

    pub fn register_arc(&mut self, name: impl Into<String>, hook: Arc<dyn Hook>) -> bool {
        let name = name.into();
        if self.hooks.contains_key(&name) {
            tracing::debug!(hook = %name, "Hook already registered, keeping first");
            return false;
        }
        self.hooks.insert(name, hook);
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Hook>> {
        self.hooks.get(name).cloned()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn list_registered(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.hooks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.list_registered())
            .finish()
    }
}
