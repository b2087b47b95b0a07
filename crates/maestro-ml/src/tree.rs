//! CART regression tree
//!
//! Trees are stored as a flat node list; internal nodes refer to their
//! children by index. A sample goes left when `x[feature] <= threshold`.
//!
//! ```json
//! {
//!   "n_features": 2,
//!   "nodes": [
//!     {"kind": "split", "feature": 0, "threshold": 1500.0, "left": 1, "right": 2},
//!     {"kind": "leaf", "value": 0.021},
//!     {"kind": "leaf", "value": 0.034}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::{ModelError, ModelResult};

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    n_features: usize,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    sse: f64,
}

impl RegressionTree {
    /// Fit on every row of `x`
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &TreeParams) -> ModelResult<Self> {
        let indices: Vec<usize> = (0..x.len()).collect();
        Self::fit_indices(x, y, &indices, params)
    }

    /// Fit on the rows named by `indices` (repeats allowed, for bootstrap samples)
    pub fn fit_indices(
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        params: &TreeParams,
    ) -> ModelResult<Self> {
        let n_features = validate_training_data(x, y)?;
        if indices.is_empty() {
            return Err(ModelError::Training("cannot fit a tree on zero samples".to_string()));
        }
        if let Some(bad) = indices.iter().find(|&&i| i >= x.len()) {
            return Err(ModelError::Training(format!("sample index {} out of range", bad)));
        }

        let mut tree = Self {
            n_features,
            nodes: Vec::new(),
        };
        tree.grow(x, y, indices.to_vec(), 0, params);
        Ok(tree)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Predict a single row; the caller guarantees `row.len() == n_features`
    pub fn predict_row(&self, row: &[f64]) -> ModelResult<f64> {
        let mut idx = 0;
        // A well-formed tree reaches a leaf in at most `nodes.len()` steps.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return Ok(*value),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).copied().ok_or_else(|| {
                        ModelError::Inference(format!("tree references missing feature {}", feature))
                    })?;
                    idx = if value <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(ModelError::Inference(format!("tree node {} does not exist", idx)));
                }
            }
        }
        Err(ModelError::Inference("tree contains a cycle".to_string()))
    }

    fn grow(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: Vec<usize>,
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let node_idx = self.nodes.len();
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64;
        self.nodes.push(Node::Leaf { value: mean });

        if depth >= params.max_depth || indices.len() < params.min_samples_split.max(2) {
            return node_idx;
        }

        let split = match best_split(x, y, &indices, params.min_samples_leaf.max(1)) {
            Some(split) => split,
            None => return node_idx,
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);

        let left = self.grow(x, y, left_rows, depth + 1, params);
        let right = self.grow(x, y, right_rows, depth + 1, params);
        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }
}

/// Checks shape and finiteness; returns the feature count
pub(crate) fn validate_training_data(x: &[Vec<f64>], y: &[f64]) -> ModelResult<usize> {
    if x.is_empty() {
        return Err(ModelError::Training("training data is empty".to_string()));
    }
    if x.len() != y.len() {
        return Err(ModelError::Training(format!(
            "{} feature rows but {} targets",
            x.len(),
            y.len()
        )));
    }
    let n_features = x[0].len();
    if n_features == 0 {
        return Err(ModelError::Training("training data has no feature columns".to_string()));
    }
    for (i, row) in x.iter().enumerate() {
        if row.len() != n_features {
            return Err(ModelError::Training(format!(
                "row {} has {} features, expected {}",
                i,
                row.len(),
                n_features
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Training(format!("row {} contains a non-finite feature", i)));
        }
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::Training("targets contain a non-finite value".to_string()));
    }
    Ok(n_features)
}

/// Lowest total squared error split over every feature, if any improves on the parent
fn best_split(x: &[Vec<f64>], y: &[f64], indices: &[usize], min_leaf: usize) -> Option<BestSplit> {
    let n = indices.len();
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n as f64;
    if parent_sse <= f64::EPSILON {
        return None;
    }

    let mut best: Option<BestSplit> = None;
    let mut order = indices.to_vec();

    for feature in 0..x[indices[0]].len() {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 1..n {
            let prev = order[k - 1];
            left_sum += y[prev];
            left_sq += y[prev] * y[prev];

            let (lo, hi) = (x[prev][feature], x[order[k]][feature]);
            if lo >= hi || k < min_leaf || n - k < min_leaf {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / k as f64)
                + (right_sq - right_sum * right_sum / (n - k) as f64);

            if best.as_ref().map_or(true, |b| sse < b.sse) {
                best = Some(BestSplit {
                    feature,
                    threshold: lo + (hi - lo) / 2.0,
                    sse,
                });
            }
        }
    }

    best.filter(|b| b.sse < parent_sse - 1e-12)
}
