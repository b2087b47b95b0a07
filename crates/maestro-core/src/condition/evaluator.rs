//! Condition evaluation against a context

use super::types::{CompareOp, Condition};
use super::MAX_DEPTH;
use crate::types::{Context, Value};
use std::cmp::Ordering;

/// Evaluate a condition tree against a context
///
/// Pure function of its inputs. A leaf whose field is absent from the context
/// (or null) never matches, whatever its operator. `Invalid` nodes never
/// match, and trees deeper than [`MAX_DEPTH`] evaluate to false.
pub fn evaluate(condition: &Condition, context: &Context) -> bool {
    evaluate_at(condition, context, 0)
}

fn evaluate_at(condition: &Condition, context: &Context, depth: usize) -> bool {
    if depth > MAX_DEPTH {
        log::warn!("Condition tree exceeds depth {}, treating as no match", MAX_DEPTH);
        return false;
    }

    match condition {
        Condition::Leaf { field, op, value } => match context.get(field) {
            None | Some(Value::Null) => {
                log::debug!("Field '{}' missing from context, leaf does not match", field);
                false
            }
            Some(actual) => compare(actual, *op, value),
        },
        Condition::And(children) => children.iter().all(|c| evaluate_at(c, context, depth + 1)),
        Condition::Or(children) => children.iter().any(|c| evaluate_at(c, context, depth + 1)),
        // A negated malformed subtree must not turn into a match.
        Condition::Not(inner) if inner.has_invalid() => false,
        Condition::Not(inner) => !evaluate_at(inner, context, depth + 1),
        Condition::Invalid { reason, .. } => {
            log::debug!("Invalid condition never matches: {}", reason);
            false
        }
    }
}

/// Apply a comparison operator: `actual <op> expected`
pub fn compare(actual: &Value, op: CompareOp, expected: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(actual, expected),
        CompareOp::Ne => !values_equal(actual, expected),
        CompareOp::Gt => ordering(actual, expected) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(
            ordering(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Lt => ordering(actual, expected) == Some(Ordering::Less),
        CompareOp::Le => matches!(
            ordering(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::In => match expected {
            Value::Array(items) => items.iter().any(|item| values_equal(actual, item)),
            Value::String(haystack) => actual.as_str().is_some_and(|s| haystack.contains(s)),
            _ => false,
        },
        CompareOp::Contains => match actual {
            Value::Array(items) => items.iter().any(|item| values_equal(item, expected)),
            Value::String(haystack) => expected.as_str().is_some_and(|s| haystack.contains(s)),
            _ => false,
        },
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l == r,
        _ => left == right,
    }
}

fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.partial_cmp(r),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}
