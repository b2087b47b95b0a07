//! Estimator trait and the persisted estimator types

use serde::{Deserialize, Serialize};

use crate::ensemble::{BoostingParams, ForestParams, GradientBoosting, RandomForest};
use crate::{ModelError, ModelKind, ModelResult};

/// A fitted single-output regressor
///
/// The store only ever talks to estimators through this trait, so tests can
/// inject stubs.
pub trait Regressor: Send + Sync {
    /// Predict one row; `features.len()` equals `n_features()`
    fn predict_one(&self, features: &[f64]) -> ModelResult<f64>;

    fn n_features(&self) -> usize;
}

/// Estimator as stored in `<kind>_model.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl Estimator {
    /// Train the estimator family used for `kind`
    ///
    /// CTR uses a random forest; ROI and channel scores use gradient boosting.
    pub fn train_for(kind: ModelKind, x: &[Vec<f64>], y: &[f64]) -> ModelResult<Self> {
        match kind {
            ModelKind::Ctr => Ok(Estimator::RandomForest(RandomForest::fit(
                x,
                y,
                &ForestParams::default(),
            )?)),
            ModelKind::Roi | ModelKind::Channel => Ok(Estimator::GradientBoosting(
                GradientBoosting::fit(x, y, &BoostingParams::default())?,
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Estimator::RandomForest(_) => "random_forest",
            Estimator::GradientBoosting(_) => "gradient_boosting",
        }
    }
}

impl Regressor for Estimator {
    fn predict_one(&self, features: &[f64]) -> ModelResult<f64> {
        if features.len() != self.n_features() {
            return Err(ModelError::Inference(format!(
                "{} expects {} features, got {}",
                self.name(),
                self.n_features(),
                features.len()
            )));
        }
        match self {
            Estimator::RandomForest(m) => m.predict_row(features),
            Estimator::GradientBoosting(m) => m.predict_row(features),
        }
    }

    fn n_features(&self) -> usize {
        match self {
            Estimator::RandomForest(m) => m.n_features(),
            Estimator::GradientBoosting(m) => m.n_features(),
        }
    }
}
