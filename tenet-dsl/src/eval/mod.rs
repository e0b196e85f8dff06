//! Tree-walking evaluation
//!
//! [`Evaluator`] is the synchronous path and rejects query functions.
//! [`AsyncEvaluator`] is the only path that may suspend, and only inside
//! query functions.

pub mod async_eval;
pub mod context;
pub mod evaluator;
pub mod ops;

pub use async_eval::AsyncEvaluator;
pub use context::EvaluationContext;
pub use evaluator::Evaluator;
