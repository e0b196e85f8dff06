//! Hook execution at lifecycle points
//!
//! Hooks at one point run strictly in declared order. Each sees the
//! updates of the hooks before it, and the first abort ends the point.
//! `afterCommit` runs after the data is durable, so nothing raised there
//! ever reaches the caller.

use std::fmt;
use std::sync::Arc;

use tenet_core::{EntityModel, GuardFailurePolicy, HookDefinition, HookPoint, QueryCapability, Record};
use tenet_dsl::{EvaluationContext, ExpressionEngine};

use crate::error::{HookError, HookServiceResult};
use crate::registry::HookRegistry;
use crate::types::{HookContext, HookResult};

/// Runs declared hooks against a shared registry.
#[derive(Clone)]
pub struct HookService {
    registry: Arc<HookRegistry>,
    engine: ExpressionEngine,
    query: Option<Arc<dyn QueryCapability>>,
    guard_policy: GuardFailurePolicy,
}

impl HookService {
    pub fn new(registry: Arc<HookRegistry>, engine: ExpressionEngine) -> Self {
        Self {
            registry,
            engine,
            query: None,
            guard_policy: GuardFailurePolicy::Skip,
        }
    }

    /// Capability behind `exists`, `count` and `lookup` in hook guards.
    /// Without one, a guard calling them fails to evaluate.
    pub fn with_query(mut self, query: Arc<dyn QueryCapability>) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_guard_policy(mut self, policy: GuardFailurePolicy) -> Self {
        self.guard_policy = policy;
        self
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Run the hooks an entity declares at `point`.
    pub async fn run_entity_hooks(
        &self,
        entity: &EntityModel,
        point: HookPoint,
        ctx: &mut HookContext,
    ) -> HookServiceResult<Option<HookResult>> {
        self.run_hooks(point, entity.hooks_at(point), ctx).await
    }

    /// Run `hooks` in order against `ctx`.
    ///
    /// Updates are merged into `ctx.record` as they arrive and returned
    /// together. An abort is returned alone. `None` means no hook had
    /// anything to say.
    pub async fn run_hooks(
        &self,
        point: HookPoint,
        hooks: &[HookDefinition],
        ctx: &mut HookContext,
    ) -> HookServiceResult<Option<HookResult>> {
        let mut updates: Option<Record> = None;

        for definition in hooks {
            let name = definition.name.as_str();

            if !definition.applies_to(ctx.operation) {
                tracing::debug!(
                    hook = %name,
                    point = %point,
                    operation = %ctx.operation,
                    "Hook does not apply to operation, skipping"
                );
                continue;
            }

            if !self.guard_passes(point, definition, ctx).await? {
                continue;
            }

            let Some(hook) = self.registry.get(name) else {
                tracing::warn!(
                    hook = %name,
                    point = %point,
                    entity = %ctx.entity,
                    "Hook is not registered, skipping"
                );
                continue;
            };

            let result = match hook.run(ctx).await {
                Ok(Some(result)) => result,
                Ok(None) => continue,
                Err(e) if point == HookPoint::AfterCommit => {
                    tracing::error!(
                        hook = %name,
                        entity = %ctx.entity,
                        error = %e,
                        "afterCommit hook failed"
                    );
                    continue;
                }
                Err(e) => {
                    return Err(HookError::Execution {
                        hook: name.to_string(),
                        reason: e.to_string(),
                    })
                }
            };

            if let Some(reason) = result.abort {
                if point == HookPoint::AfterCommit {
                    tracing::error!(
                        hook = %name,
                        entity = %ctx.entity,
                        reason = %reason,
                        "afterCommit hook requested an abort, ignoring"
                    );
                    continue;
                }
                tracing::info!(
                    hook = %name,
                    point = %point,
                    entity = %ctx.entity,
                    reason = %reason,
                    "Hook aborted operation"
                );
                return Ok(Some(HookResult::abort(reason)));
            }

            if let Some(update) = result.update {
                ctx.apply_update(&update);
                updates.get_or_insert_with(Record::new).extend(update);
            }
        }

        Ok(updates.map(HookResult::update))
    }

    async fn guard_passes(
        &self,
        point: HookPoint,
        definition: &HookDefinition,
        ctx: &HookContext,
    ) -> HookServiceResult<bool> {
        let Some(guard) = definition.when.as_deref() else {
            return Ok(true);
        };

        let mut eval_ctx = EvaluationContext::new(&ctx.record)
            .with_original(ctx.original.as_ref())
            .with_tenant(ctx.tenant_id());
        if let Some(query) = self.query.as_deref() {
            eval_ctx = eval_ctx.with_query(query);
        }
        if let Some(user) = &ctx.user {
            eval_ctx = eval_ctx.with_variable("context", user.to_value());
        }

        match self.engine.evaluate_bool_async(guard, &eval_ctx).await {
            Ok(pass) => Ok(pass),
            Err(source)
                if self.guard_policy == GuardFailurePolicy::Reject
                    && point != HookPoint::AfterCommit =>
            {
                Err(HookError::Guard {
                    hook: definition.name.clone(),
                    source,
                })
            }
            Err(e) => {
                tracing::warn!(
                    hook = %definition.name,
                    guard = %guard,
                    error = %e,
                    "Hook guard failed to evaluate, skipping hook"
                );
                Ok(false)
            }
        }
    }
}

impl fmt::Debug for HookService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookService")
            .field("registry", &self.registry)
            .field("guard_policy", &self.guard_policy)
            .field("has_query", &self.query.is_some())
            .finish_non_exhaustive()
    }
}
