//! Maestro Core - Core types for the Strategic Mind rule and inference engine
//!
//! This crate provides the fundamental types shared across the Maestro workspace:
//! - Value and context types for per-call campaign data
//! - The recursive condition tree and its evaluator
//! - Rule, action and feedback definitions
//! - Error types

pub mod condition;
pub mod error;
pub mod rule;
pub mod types;

// Re-export commonly used types
pub use condition::{evaluate, CompareOp, Condition};
pub use error::CoreError;
pub use rule::{
    merge_json, Metric, NewRule, Rule, RuleAction, RuleActions, RuleFeedback, RuleId, RuleMatch,
};
pub use types::{context_from_json, Context, Value};
