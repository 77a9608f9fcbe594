//! Evaluation engine
//!
//! This module contains the evaluation functionality including:
//! - The pull/push/value protocol and fan-out over forward links
//! - Per-module draw instrumentation
//! - The generation pass that ties index, weights and evaluation together

/// Pull, push and value evaluation
pub mod evaluator;
/// One generation run from a root seed
pub mod pass;

pub use evaluator::{Evaluator, PassStats};
pub use pass::{GenerationOutput, GenerationPass};
