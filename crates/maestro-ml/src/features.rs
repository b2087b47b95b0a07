//! Context to feature-vector coercion

use maestro_core::{Context, Value};
use serde::{Deserialize, Serialize};

use crate::{ModelError, ModelKind, ModelResult};

/// How values that are not numbers are turned into features
///
/// Numbers pass through, booleans become 1.0 / 0.0 and numeric strings are
/// parsed in both modes. The modes differ on everything else (text that is
/// not a number, lists, objects, non-finite numbers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionMode {
    /// Reject the value; the feature counts as insufficient
    #[default]
    Strict,
    /// Substitute 0.0
    Lenient,
}

/// Coerce one present value; `None` means it cannot be used
pub fn coerce(value: &Value, mode: CoercionMode) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) if n.is_finite() => Some(*n),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    };
    match (parsed, mode) {
        (Some(n), _) => Some(n),
        (None, CoercionMode::Lenient) => Some(0.0),
        (None, CoercionMode::Strict) => None,
    }
}

/// Build the ordered feature vector a model expects
///
/// Absent and null fields are reported as missing, uncoercible ones as
/// invalid. Either makes the whole call fail with `InsufficientFeatures`.
pub fn prepare_features(
    kind: ModelKind,
    names: &[String],
    context: &Context,
    mode: CoercionMode,
) -> ModelResult<Vec<f64>> {
    let mut values = Vec::with_capacity(names.len());
    let mut missing = Vec::new();
    let mut invalid = Vec::new();

    for name in names {
        match context.get(name) {
            None | Some(Value::Null) => missing.push(name.clone()),
            Some(value) => match coerce(value, mode) {
                Some(n) => values.push(n),
                None => invalid.push(name.clone()),
            },
        }
    }

    if !missing.is_empty() || !invalid.is_empty() {
        return Err(ModelError::InsufficientFeatures {
            kind,
            missing,
            invalid,
        });
    }
    Ok(values)
}
