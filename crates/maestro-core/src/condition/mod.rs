//! Condition tree module
//!
//! Rules carry a recursive condition tree evaluated against a flat context:
//!
//! - **Leaf**: `field <op> value`, with `op` one of eq, ne, gt, gte, lt, lte,
//!   in, contains (eq when omitted)
//! - **AND**: all children match (an empty AND matches)
//! - **OR**: at least one child matches (an empty OR does not)
//! - **NOT**: negation of exactly one child
//!
//! Stored JSON is converted with [`Condition::from_json`]; malformed nodes
//! become [`Condition::Invalid`] and fail closed.

mod evaluator;
mod parser;
mod types;

pub use evaluator::{compare, evaluate};
pub use types::{CompareOp, Condition};

/// Maximum nesting depth accepted when parsing and evaluating
pub const MAX_DEPTH: usize = 64;
