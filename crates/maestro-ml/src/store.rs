//! Model store: loading, prediction, training and performance reporting
//!
//! Artifacts live flat in `models_path`:
//!
//! ```text
//! ctr_model.json        serialized Estimator
//! ctr_features.json     ordered feature names
//! ctr_metrics.json      optional ModelMetrics
//! ```
//!
//! A kind is loaded only when both its model and feature files exist.

use maestro_core::Context;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

use crate::dataset::{Dataset, TrainingSet};
use crate::estimator::{Estimator, Regressor};
use crate::features::{prepare_features, CoercionMode};
use crate::metrics::{FeedbackStats, ModelFeedback, ModelMetrics};
use crate::{ModelError, ModelKind, ModelResult};

/// Datasets at least this large hold out a fifth of their rows for metrics
const HOLDOUT_MIN_ROWS: usize = 10;
const HOLDOUT_SEED: u64 = 42;

/// Output of a single model prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub prediction: f64,
    pub model_used: String,
}

/// Snapshot of what the store holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub loaded_models: Vec<ModelKind>,
    pub available_features: BTreeMap<ModelKind, Vec<String>>,
    pub metrics: BTreeMap<ModelKind, ModelMetrics>,
    pub feedback: BTreeMap<ModelKind, FeedbackStats>,
}

#[derive(Clone)]
struct LoadedModel {
    estimator: Arc<dyn Regressor>,
    features: Arc<[String]>,
    metrics: Option<ModelMetrics>,
}

/// Holds the loaded models and their feature lists
///
/// Readers predict concurrently; loading and training build a model fully
/// before taking the write lock to swap it in. Trainings run one at a time
/// so artifacts on disk always come from a single run.
pub struct ModelStore {
    models_path: PathBuf,
    coercion: CoercionMode,
    models: RwLock<HashMap<ModelKind, LoadedModel>>,
    feedback: RwLock<BTreeMap<ModelKind, FeedbackStats>>,
    training: Mutex<()>,
}

impl ModelStore {
    /// Empty store; call [`ModelStore::load_all`] to read artifacts
    pub fn new(models_path: impl Into<PathBuf>, coercion: CoercionMode) -> Self {
        Self {
            models_path: models_path.into(),
            coercion,
            models: RwLock::new(HashMap::new()),
            feedback: RwLock::new(BTreeMap::new()),
            training: Mutex::new(()),
        }
    }

    /// Store with every available artifact already loaded
    pub async fn open(models_path: impl Into<PathBuf>, coercion: CoercionMode) -> Self {
        let store = Self::new(models_path, coercion);
        store.load_all().await;
        store
    }

    pub fn models_path(&self) -> &Path {
        &self.models_path
    }

    pub fn coercion(&self) -> CoercionMode {
        self.coercion
    }

    /// Load every kind whose artifacts are present
    ///
    /// Missing files are skipped silently; unreadable ones are logged and
    /// skipped. Returns the kinds loaded by this call.
    pub async fn load_all(&self) -> Vec<ModelKind> {
        let mut loaded = Vec::new();
        for kind in ModelKind::ALL {
            match self.load_kind(kind).await {
                Ok(Some(model)) => {
                    self.models.write().await.insert(kind, model);
                    tracing::info!("{} model loaded from {}", kind, self.models_path.display());
                    loaded.push(kind);
                }
                Ok(None) => tracing::debug!("No {} model artifacts found", kind),
                Err(e) => tracing::warn!("Error loading {} model: {}", kind, e),
            }
        }
        loaded
    }

    async fn load_kind(&self, kind: ModelKind) -> ModelResult<Option<LoadedModel>> {
        let model_path = self.models_path.join(kind.model_file());
        let features_path = self.models_path.join(kind.features_file());
        if !fs::try_exists(&model_path).await? || !fs::try_exists(&features_path).await? {
            return Ok(None);
        }

        let estimator: Estimator = serde_json::from_slice(&fs::read(&model_path).await?)?;
        let features: Vec<String> = serde_json::from_slice(&fs::read(&features_path).await?)?;
        if estimator.n_features() != features.len() {
            return Err(ModelError::InvalidDataset(format!(
                "{} lists {} features but the model expects {}",
                kind.features_file(),
                features.len(),
                estimator.n_features()
            )));
        }

        let metrics_path = self.models_path.join(kind.metrics_file());
        let metrics = match fs::read(&metrics_path).await {
            Ok(bytes) => match serde_json::from_slice::<ModelMetrics>(&bytes) {
                Ok(metrics) => Some(metrics),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable {}: {}", kind.metrics_file(), e);
                    None
                }
            },
            Err(_) => None,
        };

        Ok(Some(LoadedModel {
            estimator: Arc::new(estimator),
            features: features.into(),
            metrics,
        }))
    }

    /// Install an estimator directly, replacing any loaded model of `kind`
    pub async fn insert(
        &self,
        kind: ModelKind,
        estimator: Arc<dyn Regressor>,
        features: Vec<String>,
        metrics: Option<ModelMetrics>,
    ) -> ModelResult<()> {
        if estimator.n_features() != features.len() {
            return Err(ModelError::InvalidDataset(format!(
                "{} feature names given for a model expecting {}",
                features.len(),
                estimator.n_features()
            )));
        }
        self.models.write().await.insert(
            kind,
            LoadedModel {
                estimator,
                features: features.into(),
                metrics,
            },
        );
        Ok(())
    }

    pub async fn is_loaded(&self, kind: ModelKind) -> bool {
        self.models.read().await.contains_key(&kind)
    }

    /// Ordered feature names a loaded model expects
    pub async fn required_features(&self, kind: ModelKind) -> Option<Vec<String>> {
        self.models
            .read()
            .await
            .get(&kind)
            .map(|m| m.features.to_vec())
    }

    pub async fn metrics(&self, kind: ModelKind) -> Option<ModelMetrics> {
        self.models
            .read()
            .await
            .get(&kind)
            .and_then(|m| m.metrics.clone())
    }

    /// Predict with the `kind` model
    ///
    /// The estimator is never invoked unless every required feature is
    /// present and coercible. CTR and channel scores are clamped to [0, 1];
    /// ROI is floored at 0.
    pub async fn predict(&self, kind: ModelKind, context: &Context) -> ModelResult<ModelPrediction> {
        let model = self
            .models
            .read()
            .await
            .get(&kind)
            .cloned()
            .ok_or(ModelError::ModelUnavailable(kind))?;

        let features = prepare_features(kind, &model.features, context, self.coercion)?;
        let raw = model.estimator.predict_one(&features).map_err(|e| match e {
            ModelError::Inference(_) => e,
            other => ModelError::Inference(other.to_string()),
        })?;
        if !raw.is_finite() {
            return Err(ModelError::Inference(format!(
                "{} model produced a non-finite value",
                kind
            )));
        }

        let prediction = match kind {
            ModelKind::Ctr | ModelKind::Channel => raw.clamp(0.0, 1.0),
            ModelKind::Roi => raw.max(0.0),
        };
        tracing::debug!("{} model predicted {} (raw {})", kind, prediction, raw);

        Ok(ModelPrediction {
            prediction,
            model_used: kind.model_name(),
        })
    }

    /// Train a new `kind` model on `dataset`, persist it and swap it in
    ///
    /// Returns false (and logs) on any failure; the previously loaded model,
    /// if any, stays in place.
    pub async fn train_and_save(&self, kind: ModelKind, dataset: &Dataset, target: &str) -> bool {
        match self.try_train_and_save(kind, dataset, target).await {
            Ok(metrics) => {
                tracing::info!(
                    "Trained {} model on {} samples (r2 {:.4}, mse {:.6})",
                    kind,
                    metrics.n_samples,
                    metrics.r2,
                    metrics.mse
                );
                true
            }
            Err(e) => {
                tracing::error!("Error training {} model: {}", kind, e);
                false
            }
        }
    }

    async fn try_train_and_save(
        &self,
        kind: ModelKind,
        dataset: &Dataset,
        target: &str,
    ) -> ModelResult<ModelMetrics> {
        let set = dataset.split_target(target)?;
        let feature_names = set.feature_names.clone();

        let _guard = self.training.lock().await;
        let (estimator, metrics) = tokio::task::spawn_blocking(move || fit_with_holdout(kind, set))
            .await
            .map_err(|e| ModelError::Training(format!("training task failed: {}", e)))??;

        fs::create_dir_all(&self.models_path).await?;
        // Stage every artifact before replacing any of them
        let staged = [
            (kind.model_file(), serde_json::to_vec(&estimator)?),
            (kind.features_file(), serde_json::to_vec_pretty(&feature_names)?),
            (kind.metrics_file(), serde_json::to_vec_pretty(&metrics)?),
        ];
        let mut temps = Vec::with_capacity(staged.len());
        for (file, content) in &staged {
            let tmp = self.models_path.join(format!(".{}.tmp", file));
            fs::write(&tmp, content).await?;
            temps.push((tmp, self.models_path.join(file)));
        }
        for (tmp, path) in temps {
            fs::rename(&tmp, &path).await?;
        }

        self.models.write().await.insert(
            kind,
            LoadedModel {
                estimator: Arc::new(estimator),
                features: feature_names.into(),
                metrics: Some(metrics.clone()),
            },
        );
        Ok(metrics)
    }

    pub async fn performance_report(&self) -> PerformanceReport {
        let models = self.models.read().await;
        let mut report = PerformanceReport::default();
        for (kind, model) in models.iter() {
            report.loaded_models.push(*kind);
            report.available_features.insert(*kind, model.features.to_vec());
            if let Some(metrics) = &model.metrics {
                report.metrics.insert(*kind, metrics.clone());
            }
        }
        report.loaded_models.sort();
        report.feedback = self.feedback.read().await.clone();
        report
    }

    /// Track an observed outcome; models themselves are never modified
    pub async fn record_feedback(&self, feedback: &ModelFeedback) {
        if !feedback.predicted.is_finite() || !feedback.actual.is_finite() {
            tracing::warn!("Ignoring non-finite {} model feedback", feedback.model);
            return;
        }
        self.feedback
            .write()
            .await
            .entry(feedback.model)
            .or_default()
            .record(feedback.predicted, feedback.actual);
    }
}

/// Fit on a seeded 80/20 split when the data allows, else on everything
fn fit_with_holdout(kind: ModelKind, set: TrainingSet) -> ModelResult<(Estimator, ModelMetrics)> {
    let n = set.y.len();
    if n < HOLDOUT_MIN_ROWS {
        let estimator = Estimator::train_for(kind, &set.x, &set.y)?;
        let predictions = predict_all(&estimator, &set.x)?;
        return Ok((estimator, ModelMetrics::from_predictions(&predictions, &set.y, n)));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(HOLDOUT_SEED));
    let (test_idx, train_idx) = order.split_at(n / 5);

    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
        idx.iter().map(|&i| (set.x[i].clone(), set.y[i])).unzip()
    };
    let (train_x, train_y) = pick(train_idx);
    let (test_x, test_y) = pick(test_idx);

    let estimator = Estimator::train_for(kind, &train_x, &train_y)?;
    let predictions = predict_all(&estimator, &test_x)?;
    Ok((
        estimator,
        ModelMetrics::from_predictions(&predictions, &test_y, train_y.len()),
    ))
}

fn predict_all(estimator: &Estimator, x: &[Vec<f64>]) -> ModelResult<Vec<f64>> {
    x.iter().map(|row| estimator.predict_one(row)).collect()
}
