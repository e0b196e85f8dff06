//! TENET Core - Shared Types
//!
//! Values, records, declarative rule descriptors, entity metadata, query
//! filters and configuration. Every other crate in the workspace depends
//! on this one. It holds data and the value semantics that must agree
//! everywhere, nothing else.

mod config;
mod context;
mod definitions;
mod entities;
mod enums;
mod error;
mod filter;
mod query;
mod validation;
mod value;

pub use config::*;
pub use context::*;
pub use definitions::*;
pub use entities::*;
pub use enums::*;
pub use error::*;
pub use filter::*;
pub use query::*;
pub use validation::*;
pub use value::*;
