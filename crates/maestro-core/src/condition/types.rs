//! Condition tree types

use crate::types::Value;
use std::fmt;
use std::str::FromStr;

/// Comparison operator used by leaf conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareOp {
    /// Equal (default when a stored leaf omits its operator)
    #[default]
    Eq,
    /// Not equal
    Ne,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Context value is a member of the rule's list
    In,
    /// Context value (list or string) contains the rule's value
    Contains,
}

impl CompareOp {
    /// Canonical name written back to storage
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Le => "lte",
            CompareOp::In => "in",
            CompareOp::Contains => "contains",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "eq" | "==" | "=" | "equals" | "$eq" => CompareOp::Eq,
            "ne" | "!=" | "not_equals" | "$ne" => CompareOp::Ne,
            "gt" | ">" | "greater_than" | "$gt" => CompareOp::Gt,
            "gte" | "ge" | ">=" | "greater_or_equal" | "$gte" => CompareOp::Ge,
            "lt" | "<" | "less_than" | "$lt" => CompareOp::Lt,
            "lte" | "le" | "<=" | "less_or_equal" | "$lte" => CompareOp::Le,
            "in" | "$in" => CompareOp::In,
            "contains" | "$contains" => CompareOp::Contains,
            other => return Err(format!("unsupported comparison operator '{}'", other)),
        };
        Ok(op)
    }
}

/// A rule's condition tree
///
/// Stored rules carry loosely-typed JSON; [`Condition::from_json`] turns it
/// into this tree once, at the persistence boundary, so evaluation is an
/// exhaustive match instead of string dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Compare one context field against a literal
    Leaf {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// All children must match; empty is vacuously true
    And(Vec<Condition>),
    /// At least one child must match; empty is false
    Or(Vec<Condition>),
    /// Negation of exactly one child
    Not(Box<Condition>),
    /// Malformed stored data, kept verbatim. Never matches.
    Invalid {
        reason: String,
        raw: serde_json::Value,
    },
}

impl Condition {
    /// Leaf comparing `field` for equality with `value`
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::leaf(field, CompareOp::Eq, value)
    }

    pub fn leaf(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Condition::Leaf {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn not(inner: Condition) -> Self {
        Condition::Not(Box::new(inner))
    }

    /// True if this node, or any node below it, is `Invalid`
    pub fn has_invalid(&self) -> bool {
        match self {
            Condition::Invalid { .. } => true,
            Condition::Leaf { .. } => false,
            Condition::And(children) | Condition::Or(children) => {
                children.iter().any(Condition::has_invalid)
            }
            Condition::Not(inner) => inner.has_invalid(),
        }
    }

    /// Names of every context field referenced by the tree
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Leaf { field, .. } => {
                if !out.contains(&field.as_str()) {
                    out.push(field.as_str());
                }
            }
            Condition::And(children) | Condition::Or(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
            Condition::Not(inner) => inner.collect_fields(out),
            Condition::Invalid { .. } => {}
        }
    }
}
