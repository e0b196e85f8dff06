//! TENET Validation
//!
//! The record lifecycle on top of the expression engine:
//!
//! - Defaults computed before validation, with auto-filled audit fields
//! - Field-constraint validators generated from field metadata
//! - Canned validators configured by declaration
//! - Tenant-configured validators loaded at runtime
//! - Signed, content-bound acknowledgment tokens for warnings
//! - A write pipeline that folds hooks around the caller's persistence
//!
//! Errors block a write. Warnings only require the caller to acknowledge
//! them by echoing back a token issued for the exact record.

pub mod canned;

mod acknowledgment;
mod defaulting;
mod error;
mod field_constraints;
mod interpolation;
mod lifecycle;
mod metadata;
mod pipeline;
mod registry;
mod service;
mod validator;

pub use acknowledgment::*;
pub use defaulting::*;
pub use error::*;
pub use field_constraints::*;
pub use interpolation::*;
pub use lifecycle::*;
pub use metadata::*;
pub use pipeline::*;
pub use registry::*;
pub use service::*;
pub use validator::*;
