//! Training metrics and prediction feedback tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ModelKind;

/// Fit quality recorded next to a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub r2: f64,
    pub mse: f64,
    pub n_samples: usize,
    pub trained_at: DateTime<Utc>,
}

impl ModelMetrics {
    pub fn from_predictions(predictions: &[f64], targets: &[f64], n_samples: usize) -> Self {
        let (r2, mse) = r2_and_mse(predictions, targets);
        Self {
            r2,
            mse,
            n_samples,
            trained_at: Utc::now(),
        }
    }

    /// r² clamped into [0, 1], used as the model's confidence
    pub fn confidence(&self) -> f64 {
        if self.r2.is_nan() {
            0.0
        } else {
            self.r2.clamp(0.0, 1.0)
        }
    }
}

/// Coefficient of determination and mean squared error
///
/// A constant target gives r² = 1.0 when predicted exactly, else 0.0.
pub fn r2_and_mse(predictions: &[f64], targets: &[f64]) -> (f64, f64) {
    let n = targets.len().min(predictions.len());
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = targets[..n].iter().sum::<f64>() / n as f64;
    let sse: f64 = predictions[..n]
        .iter()
        .zip(&targets[..n])
        .map(|(p, t)| (t - p).powi(2))
        .sum();
    let sst: f64 = targets[..n].iter().map(|t| (t - mean).powi(2)).sum();
    let r2 = if sst > 0.0 {
        1.0 - sse / sst
    } else if sse == 0.0 {
        1.0
    } else {
        0.0
    };
    (r2, sse / n as f64)
}

/// Observed outcome for a model prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFeedback {
    pub model: ModelKind,
    pub predicted: f64,
    pub actual: f64,
}

/// Running accuracy of a model against reported outcomes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub count: u64,
    pub mean_absolute_error: f64,
}

impl FeedbackStats {
    pub fn record(&mut self, predicted: f64, actual: f64) {
        let error = (predicted - actual).abs();
        self.count += 1;
        self.mean_absolute_error += (error - self.mean_absolute_error) / self.count as f64;
    }
}
