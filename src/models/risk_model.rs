use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const TRANSACTION_RISK_MODEL: &str = "transaction_risk";
pub const CONTRACT_RISK_MODEL: &str = "contract_risk";
pub const RUG_PULL_MODEL: &str = "rug_pull_detector";

pub const HIGH_RISK_THRESHOLD: &str = "high_risk";
pub const MEDIUM_RISK_THRESHOLD: &str = "medium_risk";
pub const POSSIBLE_THRESHOLD: &str = "possible";
pub const LIKELY_THRESHOLD: &str = "likely";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Classification,
    AnomalyDetection,
}

/// A named, weighted feature model. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskModel {
    pub id: String,
    pub version: String,
    pub kind: ModelKind,
    pub features: Vec<String>,
    pub weights: HashMap<String, f64>,
    pub thresholds: HashMap<String, f64>,
}

impl RiskModel {
    pub fn new(id: &str, version: &str, kind: ModelKind) -> Self {
        Self {
            id: id.to_string(),
            version: version.to_string(),
            kind,
            features: Vec::new(),
            weights: HashMap::new(),
            thresholds: HashMap::new(),
        }
    }

    /// Append a feature with its weight. Order of calls is the feature order.
    pub fn with_feature(mut self, name: &str, weight: f64) -> Self {
        self.features.push(name.to_string());
        self.weights.insert(name.to_string(), weight);
        self
    }

    pub fn with_threshold(mut self, level: &str, cutoff: f64) -> Self {
        self.thresholds.insert(level.to_string(), cutoff.clamp(0.0, 1.0));
        self
    }

    pub fn threshold(&self, level: &str) -> Option<f64> {
        self.thresholds.get(level).copied()
    }

    pub fn weight(&self, feature: &str) -> f64 {
        self.weights.get(feature).copied().unwrap_or(0.0)
    }
}

/// Fixed set of models available to a scorer instance.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, RiskModel>,
}

impl ModelRegistry {
    pub fn new(models: Vec<RiskModel>) -> Self {
        Self {
            models: models.into_iter().map(|m| (m.id.clone(), m)).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&RiskModel> {
        self.models.get(id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn model_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.models.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// The built-in models: transaction and contract classifiers plus the
    /// rug-pull anomaly detector.
    pub fn default_models() -> Self {
        let transaction = RiskModel::new(TRANSACTION_RISK_MODEL, "1.0.0", ModelKind::Classification)
            .with_feature("sender_age", 0.15)
            .with_feature("counterparty_risk", 0.35)
            .with_feature("amount_anomaly", 0.2)
            .with_feature("gas_anomaly", 0.1)
            .with_feature("interaction_novelty", 0.2)
            .with_threshold(HIGH_RISK_THRESHOLD, 0.7)
            .with_threshold(MEDIUM_RISK_THRESHOLD, 0.4);

        let contract = RiskModel::new(CONTRACT_RISK_MODEL, "1.0.0", ModelKind::Classification)
            .with_feature("liquidity_risk", 0.25)
            .with_feature("holder_concentration", 0.25)
            .with_feature("contract_age_risk", 0.1)
            .with_feature("unverified_source", 0.2)
            .with_feature("owner_privileges", 0.2)
            .with_threshold(HIGH_RISK_THRESHOLD, 0.7)
            .with_threshold(MEDIUM_RISK_THRESHOLD, 0.4);

        let rug_pull = RiskModel::new(RUG_PULL_MODEL, "1.0.0", ModelKind::AnomalyDetection)
            .with_feature("unlocked_liquidity", 0.3)
            .with_feature("holder_concentration", 0.2)
            .with_feature("owner_privileges", 0.2)
            .with_feature("mint_capability", 0.15)
            .with_feature("liquidity_outflow", 0.15)
            .with_threshold(POSSIBLE_THRESHOLD, 0.5)
            .with_threshold(LIKELY_THRESHOLD, 0.8);

        Self::new(vec![transaction, contract, rug_pull])
    }
}
