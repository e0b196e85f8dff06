//! TENET Hooks
//!
//! Application code attached to record lifecycle points:
//! `beforeSave`, `afterSave`, `afterCommit` and `beforeDelete`.
//!
//! Hooks are registered by name in a [`HookRegistry`] at startup. Entities
//! declare which hooks run where; [`HookService`] executes those
//! declarations in order, folding field updates into the in-flight record.

mod error;
mod registry;
mod service;
mod types;

pub use error::*;
pub use registry::*;
pub use service::*;
pub use types::*;
