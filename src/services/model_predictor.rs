use async_trait::async_trait;
use tracing::debug;

use crate::error::ScoringError;
use crate::models::RiskModel;
use crate::services::feature_provider::FeatureVector;
use crate::utils::math::{clamp_unit, weighted_average};

/// Turns a feature vector into a risk probability in [0, 1] for one model.
#[async_trait]
pub trait ModelPredictor: Send + Sync {
    async fn predict(&self, model: &RiskModel, features: &FeatureVector) -> Result<f64, ScoringError>;
}

/// Weighted mean of the model's features. Missing or non-finite features
/// take the neutral placeholder value.
#[derive(Debug, Clone, Copy)]
pub struct WeightedModelPredictor {
    neutral_value: f64,
}

impl WeightedModelPredictor {
    pub fn new(neutral_value: f64) -> Self {
        Self {
            neutral_value: clamp_unit(neutral_value),
        }
    }
}

impl Default for WeightedModelPredictor {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[async_trait]
impl ModelPredictor for WeightedModelPredictor {
    async fn predict(&self, model: &RiskModel, features: &FeatureVector) -> Result<f64, ScoringError> {
        let mut missing = 0usize;
        let pairs: Vec<(f64, f64)> = model
            .features
            .iter()
            .map(|name| {
                let value = match features.get(name) {
                    Some(v) if v.is_finite() => clamp_unit(*v),
                    _ => {
                        missing += 1;
                        self.neutral_value
                    }
                };
                (value, model.weight(name))
            })
            .collect();

        let prediction = weighted_average(&pairs).ok_or_else(|| ScoringError::PredictionFailed {
            model: model.id.clone(),
            message: "model has no positively weighted features".to_string(),
        })?;

        debug!(model = %model.id, prediction, missing_features = missing, "Model prediction computed");
        Ok(clamp_unit(prediction))
    }
}
