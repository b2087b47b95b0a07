//! Tabular training data

use maestro_core::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::features::{coerce, CoercionMode};
use crate::{ModelError, ModelResult};

/// Named numeric columns, one row per sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

/// Features and target separated for fitting
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub feature_names: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> ModelResult<Self> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(ModelError::InvalidDataset(format!(
                "row {} has {} values, expected {}",
                i,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Build from JSON objects
    ///
    /// Columns are the union of keys, sorted by name. Cells are coerced the
    /// same way prediction features are; in strict mode an absent or
    /// uncoercible cell is an error, in lenient mode it becomes 0.0.
    pub fn from_records(records: &[serde_json::Value], mode: CoercionMode) -> ModelResult<Self> {
        let mut names = BTreeSet::new();
        for (i, record) in records.iter().enumerate() {
            let obj = record.as_object().ok_or_else(|| {
                ModelError::InvalidDataset(format!("record {} is not a JSON object", i))
            })?;
            names.extend(obj.keys().cloned());
        }
        let columns: Vec<String> = names.into_iter().collect();

        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let mut row = Vec::with_capacity(columns.len());
            for column in &columns {
                let value = record.get(column).cloned().map(Value::from).unwrap_or(Value::Null);
                let cell = match (&value, mode) {
                    (Value::Null, CoercionMode::Lenient) => Some(0.0),
                    (Value::Null, CoercionMode::Strict) => None,
                    (value, mode) => coerce(value, mode),
                };
                match cell {
                    Some(n) => row.push(n),
                    None => {
                        return Err(ModelError::InvalidDataset(format!(
                            "record {} has no numeric value for '{}'",
                            i, column
                        )))
                    }
                }
            }
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Separate `target` from the feature columns, keeping column order
    pub fn split_target(&self, target: &str) -> ModelResult<TrainingSet> {
        let target_idx = self
            .columns
            .iter()
            .position(|c| c == target)
            .ok_or_else(|| ModelError::InvalidDataset(format!("target column '{}' not found", target)))?;
        if self.columns.len() < 2 {
            return Err(ModelError::InvalidDataset(
                "dataset has no feature columns besides the target".to_string(),
            ));
        }

        let feature_names = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target_idx)
            .map(|(_, c)| c.clone())
            .collect();
        let mut x = Vec::with_capacity(self.rows.len());
        let mut y = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            y.push(row[target_idx]);
            x.push(
                row.iter()
                    .enumerate()
                    .filter(|(i, _)| *i != target_idx)
                    .map(|(_, v)| *v)
                    .collect(),
            );
        }

        Ok(TrainingSet { feature_names, x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_records_sorted_columns() {
        let records = vec![
            json!({"budget": 1000, "ctr": 0.02, "is_b2b": false}),
            json!({"budget": "5000", "ctr": 0.03, "is_b2b": true}),
        ];
        let dataset = Dataset::from_records(&records, CoercionMode::Strict).unwrap();
        assert_eq!(dataset.columns, vec!["budget", "ctr", "is_b2b"]);
        assert_eq!(dataset.rows[1], vec![5000.0, 0.03, 1.0]);
    }

    #[test]
    fn test_from_records_strict_vs_lenient() {
        let records = vec![json!({"budget": 1000, "ctr": 0.02}), json!({"ctr": 0.03})];
        assert!(matches!(
            Dataset::from_records(&records, CoercionMode::Strict),
            Err(ModelError::InvalidDataset(_))
        ));
        let lenient = Dataset::from_records(&records, CoercionMode::Lenient).unwrap();
        assert_eq!(lenient.rows[1], vec![0.0, 0.03]);

        assert!(Dataset::from_records(&[json!([1])], CoercionMode::Lenient).is_err());
    }

    #[test]
    fn test_split_target() {
        let dataset = Dataset::new(
            vec!["budget".into(), "ctr".into(), "duration".into()],
            vec![vec![1000.0, 0.02, 7.0], vec![2000.0, 0.04, 14.0]],
        )
        .unwrap();
        let set = dataset.split_target("ctr").unwrap();
        assert_eq!(set.feature_names, vec!["budget", "duration"]);
        assert_eq!(set.x, vec![vec![1000.0, 7.0], vec![2000.0, 14.0]]);
        assert_eq!(set.y, vec![0.02, 0.04]);

        assert!(dataset.split_target("roi").is_err());
    }

    #[test]
    fn test_new_checks_row_width() {
        assert!(Dataset::new(vec!["a".into()], vec![vec![1.0, 2.0]]).is_err());
    }
}
