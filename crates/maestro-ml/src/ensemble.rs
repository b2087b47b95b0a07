//! Tree ensembles: bagged random forest and squared-loss gradient boosting

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::tree::{validate_training_data, RegressionTree, TreeParams};
use crate::{ModelError, ModelResult};

/// Random forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub tree: TreeParams,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            tree: TreeParams {
                max_depth: 10,
                ..TreeParams::default()
            },
            seed: 42,
        }
    }
}

/// Average of trees fitted on bootstrap samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> ModelResult<Self> {
        let n_features = validate_training_data(x, y)?;
        if params.n_estimators == 0 {
            return Err(ModelError::Training("forest needs at least one tree".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = x.len();
        let mut trees = Vec::with_capacity(params.n_estimators);
        for _ in 0..params.n_estimators {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(RegressionTree::fit_indices(x, y, &sample, &params.tree)?);
        }

        tracing::debug!("Fitted random forest with {} trees on {} samples", trees.len(), n);
        Ok(Self { n_features, trees })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_row(&self, row: &[f64]) -> ModelResult<f64> {
        if self.trees.is_empty() {
            return Err(ModelError::Inference("forest has no trees".to_string()));
        }
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.predict_row(row)?;
        }
        Ok(sum / self.trees.len() as f64)
    }
}

/// Gradient boosting hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub tree: TreeParams,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            tree: TreeParams {
                max_depth: 5,
                ..TreeParams::default()
            },
        }
    }
}

/// Additive model of shallow trees fitted to residuals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    n_features: usize,
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &BoostingParams) -> ModelResult<Self> {
        let n_features = validate_training_data(x, y)?;
        if !(params.learning_rate > 0.0 && params.learning_rate.is_finite()) {
            return Err(ModelError::Training(format!(
                "learning rate must be positive, got {}",
                params.learning_rate
            )));
        }

        let init = y.iter().sum::<f64>() / y.len() as f64;
        let mut current = vec![init; y.len()];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, p)| t - p).collect();
            let tree = RegressionTree::fit(x, &residuals, &params.tree)?;
            for (row, pred) in x.iter().zip(current.iter_mut()) {
                *pred += params.learning_rate * tree.predict_row(row)?;
            }
            trees.push(tree);
        }

        tracing::debug!("Fitted gradient boosting with {} stages on {} samples", trees.len(), y.len());
        Ok(Self {
            n_features,
            init,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn predict_row(&self, row: &[f64]) -> ModelResult<f64> {
        let mut value = self.init;
        for tree in &self.trees {
            value += self.learning_rate * tree.predict_row(row)?;
        }
        Ok(value)
    }
}
