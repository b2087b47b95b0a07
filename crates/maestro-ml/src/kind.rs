//! Model kinds and their artifact file names

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three predictive models the store manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Ctr,
    Roi,
    Channel,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Ctr, ModelKind::Roi, ModelKind::Channel];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Ctr => "ctr",
            ModelKind::Roi => "roi",
            ModelKind::Channel => "channel",
        }
    }

    /// Name reported in `ModelPrediction::model_used`
    pub fn model_name(&self) -> String {
        format!("{}_model", self.as_str())
    }

    pub fn model_file(&self) -> String {
        format!("{}_model.json", self.as_str())
    }

    pub fn features_file(&self) -> String {
        format!("{}_features.json", self.as_str())
    }

    pub fn metrics_file(&self) -> String {
        format!("{}_metrics.json", self.as_str())
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ctr" => Ok(ModelKind::Ctr),
            "roi" => Ok(ModelKind::Roi),
            "channel" => Ok(ModelKind::Channel),
            other => Err(format!("unknown model kind '{}'", other)),
        }
    }
}
