#![allow(dead_code)]

use address_risk_monitor::{
    config::{MonitorSettings, ScoringSettings},
    error::{AppError, ScoringError},
    models::{default_alert_rules, AddressKey, ModelRegistry, RiskModel, RUG_PULL_MODEL},
    services::{
        AlertDispatcher, ChainReader, FeatureVector, ModelPredictor, MonitoringService, NeutralFeatureProvider,
        RiskScorer,
    },
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const CONTRACT_CODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52];

/// In-memory chain: addresses with registered code are contracts, anything
/// else is an account. Addresses can be switched to fail.
#[derive(Default)]
pub struct StubChain {
    code: RwLock<HashMap<AddressKey, Vec<u8>>>,
    failing: RwLock<HashSet<AddressKey>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup takes `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_contract(self, address: &str, chain_id: u64) -> Self {
        self.set_code(address, chain_id, CONTRACT_CODE.to_vec());
        self
    }

    pub fn set_code(&self, address: &str, chain_id: u64, code: Vec<u8>) {
        self.code.write().unwrap().insert(AddressKey::new(address, chain_id), code);
    }

    pub fn set_failing(&self, address: &str, chain_id: u64, failing: bool) {
        let key = AddressKey::new(address, chain_id);
        let mut set = self.failing.write().unwrap();
        if failing {
            set.insert(key);
        } else {
            set.remove(&key);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainReader for StubChain {
    async fn get_code(&self, address: &str, chain_id: u64) -> Result<Vec<u8>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let key = AddressKey::new(address, chain_id);
        if self.failing.read().unwrap().contains(&key) {
            return Err(AppError::ChainError(format!("node unavailable for {}", address)));
        }
        Ok(self.code.read().unwrap().get(&key).cloned().unwrap_or_default())
    }
}

/// Returns a fixed prediction per model id (0.0 for unlisted models) and
/// counts calls.
#[derive(Default)]
pub struct FixedPredictor {
    predictions: HashMap<String, f64>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FixedPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, model: &str, prediction: f64) -> Self {
        self.predictions.insert(model.to_string(), prediction);
        self
    }

    pub fn failing_for(mut self, model: &str) -> Self {
        self.failing.insert(model.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelPredictor for FixedPredictor {
    async fn predict(&self, model: &RiskModel, _features: &FeatureVector) -> Result<f64, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&model.id) {
            return Err(ScoringError::PredictionFailed {
                model: model.id.clone(),
                message: "stub failure".to_string(),
            });
        }
        Ok(self.predictions.get(&model.id).copied().unwrap_or(0.0))
    }
}

pub fn scorer_with(settings: ScoringSettings, predictor: Arc<FixedPredictor>) -> Arc<RiskScorer> {
    Arc::new(
        RiskScorer::new(settings, ModelRegistry::default_models(), Arc::new(NeutralFeatureProvider))
            .with_predictor(predictor),
    )
}

/// Scorer whose only signal is a rug-pull prediction.
pub fn rug_pull_scorer(prediction: f64) -> (Arc<RiskScorer>, Arc<FixedPredictor>) {
    let predictor = Arc::new(FixedPredictor::new().with(RUG_PULL_MODEL, prediction));
    (scorer_with(ScoringSettings::default(), predictor.clone()), predictor)
}

pub fn monitor_with(chain: Arc<StubChain>, scorer: Arc<RiskScorer>) -> Arc<MonitoringService> {
    monitor_with_settings(MonitorSettings::default(), chain, scorer)
}

pub fn monitor_with_settings(settings: MonitorSettings, chain: Arc<StubChain>, scorer: Arc<RiskScorer>) -> Arc<MonitoringService> {
    Arc::new(
        MonitoringService::new(settings, chain, scorer, AlertDispatcher::new(), default_alert_rules())
            .expect("default rules are unique"),
    )
}
