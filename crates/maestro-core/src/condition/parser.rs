//! Permissive JSON <-> condition tree conversion
//!
//! Stored conditions come in two shapes:
//!
//! ```json
//! {"field": "industry", "value": "technology"}
//! {"field": "budget", "operator": "gte", "value": 5000}
//! {"field": "budget", "value": {"$gte": 1000, "$lte": 5000}}
//! {"operator": "AND", "conditions": [ ... ]}
//! ```
//!
//! A leaf is recognised first (an object with both `field` and `value`), then
//! a composite (`operator` + `conditions`). Anything else parses to
//! [`Condition::Invalid`], which keeps the raw JSON so it can be written back
//! untouched and never matches during evaluation.

use super::types::{CompareOp, Condition};
use super::MAX_DEPTH;
use crate::types::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map};

impl Condition {
    /// Parse a stored JSON condition
    ///
    /// Never fails: malformed input becomes an `Invalid` node.
    pub fn from_json(json: &serde_json::Value) -> Condition {
        parse_node(json, 0)
    }

    /// Parse a condition stored as JSON text (legacy text columns)
    pub fn from_json_str(text: &str) -> Condition {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(json) => Condition::from_json(&json),
            Err(e) => invalid(format!("condition is not valid JSON: {}", e), json!(text)),
        }
    }

    /// Render the canonical stored form
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Condition::Leaf { field, op, value } => {
                let mut map = Map::new();
                map.insert("field".to_string(), json!(field));
                if *op != CompareOp::Eq {
                    map.insert("operator".to_string(), json!(op.as_str()));
                }
                map.insert("value".to_string(), value.clone().into_json());
                serde_json::Value::Object(map)
            }
            Condition::And(children) => composite_json("AND", children.iter()),
            Condition::Or(children) => composite_json("OR", children.iter()),
            Condition::Not(inner) => composite_json("NOT", std::iter::once(inner.as_ref())),
            Condition::Invalid { raw, .. } => raw.clone(),
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Condition::from_json(&json))
    }
}

fn composite_json<'a>(
    operator: &str,
    children: impl Iterator<Item = &'a Condition>,
) -> serde_json::Value {
    json!({
        "operator": operator,
        "conditions": children.map(Condition::to_json).collect::<Vec<_>>(),
    })
}

fn invalid(reason: String, raw: serde_json::Value) -> Condition {
    log::warn!("Invalid stored condition: {}", reason);
    Condition::Invalid { reason, raw }
}

fn parse_node(json: &serde_json::Value, depth: usize) -> Condition {
    if depth > MAX_DEPTH {
        return invalid(
            format!("condition nested deeper than {} levels", MAX_DEPTH),
            json.clone(),
        );
    }

    let obj = match json.as_object() {
        Some(obj) => obj,
        None => return invalid("condition must be a JSON object".to_string(), json.clone()),
    };

    if obj.contains_key("field") && obj.contains_key("value") {
        return parse_leaf(obj, json);
    }

    if let (Some(operator), Some(conditions)) = (obj.get("operator"), obj.get("conditions")) {
        return parse_composite(operator, conditions, json, depth);
    }

    invalid(
        "expected a leaf (field/value) or a composite (operator/conditions)".to_string(),
        json.clone(),
    )
}

fn parse_leaf(obj: &Map<String, serde_json::Value>, raw: &serde_json::Value) -> Condition {
    let field = match obj.get("field").and_then(|f| f.as_str()) {
        Some(field) => field.to_string(),
        None => return invalid("leaf 'field' must be a string".to_string(), raw.clone()),
    };
    let value = &obj["value"];

    let explicit_op = obj.get("operator").or_else(|| obj.get("op"));
    match explicit_op {
        Some(op_json) => {
            let op = match op_json.as_str().map(str::parse::<CompareOp>) {
                Some(Ok(op)) => op,
                Some(Err(e)) => return invalid(e, raw.clone()),
                None => return invalid("leaf 'operator' must be a string".to_string(), raw.clone()),
            };
            Condition::Leaf {
                field,
                op,
                value: Value::from(value.clone()),
            }
        }
        None => match operator_map(value) {
            // Legacy form: {"field": "budget", "value": {"$gte": 10, "$lte": 20}}
            Some(ops) => {
                let mut leaves = Vec::with_capacity(ops.len());
                for (key, operand) in ops {
                    match key.parse::<CompareOp>() {
                        Ok(op) => leaves.push(Condition::Leaf {
                            field: field.clone(),
                            op,
                            value: Value::from(operand.clone()),
                        }),
                        Err(e) => return invalid(e, raw.clone()),
                    }
                }
                if leaves.len() == 1 {
                    leaves.remove(0)
                } else {
                    Condition::And(leaves)
                }
            }
            None => Condition::Leaf {
                field,
                op: CompareOp::Eq,
                value: Value::from(value.clone()),
            },
        },
    }
}

/// Returns the entries of a `{"$op": operand, ...}` object, if `value` is one
fn operator_map(value: &serde_json::Value) -> Option<Vec<(&String, &serde_json::Value)>> {
    let obj = value.as_object()?;
    if obj.is_empty() || !obj.keys().all(|k| k.starts_with('$')) {
        return None;
    }
    Some(obj.iter().collect())
}

fn parse_composite(
    operator: &serde_json::Value,
    conditions: &serde_json::Value,
    raw: &serde_json::Value,
    depth: usize,
) -> Condition {
    let operator = match operator.as_str() {
        Some(op) => op.trim().to_ascii_uppercase(),
        None => return invalid("composite 'operator' must be a string".to_string(), raw.clone()),
    };
    let items = match conditions.as_array() {
        Some(items) => items,
        None => return invalid("composite 'conditions' must be a list".to_string(), raw.clone()),
    };

    let mut children: Vec<Condition> = items.iter().map(|c| parse_node(c, depth + 1)).collect();

    match operator.as_str() {
        "AND" => Condition::And(children),
        "OR" => Condition::Or(children),
        "NOT" => {
            if children.len() != 1 {
                return invalid(
                    format!("NOT takes exactly one condition, got {}", children.len()),
                    raw.clone(),
                );
            }
            Condition::Not(Box::new(children.remove(0)))
        }
        other => invalid(format!("unsupported logical operator '{}'", other), raw.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_leaf() {
        let cond = Condition::from_json(&json!({"field": "industry", "value": "technology"}));
        assert_eq!(cond, Condition::equals("industry", "technology"));
    }

    #[test]
    fn test_parse_leaf_with_operator() {
        let cond = Condition::from_json(&json!({"field": "budget", "operator": ">=", "value": 5000}));
        assert_eq!(cond, Condition::leaf("budget", CompareOp::Ge, 5000.0));

        let cond = Condition::from_json(&json!({"field": "budget", "op": "lt", "value": 10}));
        assert_eq!(cond, Condition::leaf("budget", CompareOp::Lt, 10.0));
    }

    #[test]
    fn test_parse_legacy_operator_map() {
        let cond = Condition::from_json(&json!({"field": "budget", "value": {"$gte": 1000, "$lte": 5000}}));
        match cond {
            Condition::And(leaves) => {
                assert_eq!(leaves.len(), 2);
                assert!(leaves.contains(&Condition::leaf("budget", CompareOp::Ge, 1000.0)));
                assert!(leaves.contains(&Condition::leaf("budget", CompareOp::Le, 5000.0)));
            }
            other => panic!("Expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_object_value_is_equality() {
        let cond = Condition::from_json(&json!({"field": "meta", "value": {"k": 1}}));
        assert!(matches!(cond, Condition::Leaf { op: CompareOp::Eq, .. }));
    }

    #[test]
    fn test_parse_composite() {
        let cond = Condition::from_json(&json!({
            "operator": "or",
            "conditions": [
                {"field": "channel", "value": "email"},
                {"operator": "NOT", "conditions": [{"field": "industry", "value": "food"}]}
            ]
        }));
        assert_eq!(
            cond,
            Condition::Or(vec![
                Condition::equals("channel", "email"),
                Condition::not(Condition::equals("industry", "food")),
            ])
        );
    }

    #[test]
    fn test_not_requires_exactly_one_child() {
        let empty = Condition::from_json(&json!({"operator": "NOT", "conditions": []}));
        assert!(matches!(empty, Condition::Invalid { .. }));

        let two = Condition::from_json(&json!({
            "operator": "NOT",
            "conditions": [{"field": "a", "value": 1}, {"field": "b", "value": 2}]
        }));
        assert!(matches!(two, Condition::Invalid { .. }));
    }

    #[test]
    fn test_unknown_operators_are_invalid() {
        let leaf = Condition::from_json(&json!({"field": "a", "operator": "between", "value": [1, 2]}));
        assert!(matches!(leaf, Condition::Invalid { .. }));

        let composite = Condition::from_json(&json!({"operator": "XOR", "conditions": []}));
        assert!(matches!(composite, Condition::Invalid { .. }));
    }

    #[test]
    fn test_malformed_shapes_are_invalid() {
        assert!(matches!(Condition::from_json(&json!({})), Condition::Invalid { .. }));
        assert!(matches!(Condition::from_json(&json!([1, 2])), Condition::Invalid { .. }));
        assert!(matches!(
            Condition::from_json(&json!({"field": 3, "value": 1})),
            Condition::Invalid { .. }
        ));
        assert!(matches!(
            Condition::from_json(&json!({"operator": "AND", "conditions": "x"})),
            Condition::Invalid { .. }
        ));
    }

    #[test]
    fn test_from_json_str() {
        let cond = Condition::from_json_str(r#"{"field": "a", "value": 1}"#);
        assert_eq!(cond, Condition::equals("a", 1.0));
        assert!(matches!(Condition::from_json_str("{not json"), Condition::Invalid { .. }));
    }

    #[test]
    fn test_to_json_round_trip_preserves_structure() {
        let original = json!({
            "operator": "AND",
            "conditions": [
                {"field": "industry", "value": "technology"},
                {"field": "budget", "operator": "gt", "value": 1000.0},
                {"operator": "NOT", "conditions": [{"field": "channel", "value": "display"}]}
            ]
        });
        let cond = Condition::from_json(&original);
        assert_eq!(cond.to_json(), original);
        assert_eq!(Condition::from_json(&cond.to_json()), cond);
    }

    #[test]
    fn test_invalid_keeps_raw_json() {
        let raw = json!({"operator": "XOR", "conditions": []});
        assert_eq!(Condition::from_json(&raw).to_json(), raw);
    }

    #[test]
    fn test_depth_limit() {
        let mut json = json!({"field": "a", "value": 1});
        for _ in 0..(MAX_DEPTH + 5) {
            json = json!({"operator": "AND", "conditions": [json]});
        }
        assert!(Condition::from_json(&json).has_invalid());
    }
}
