use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::ScoringError;
use crate::models::{AddressKey, TransactionRiskRequest};

/// Named numeric features, roughly normalised to [0, 1].
pub type FeatureVector = HashMap<String, f64>;

/// Source of risk features for transactions and contracts.
///
/// Implementations may block on I/O. An empty vector means "nothing known";
/// models then fall back to neutral placeholders.
#[async_trait]
pub trait FeatureProvider: Send + Sync {
    async fn transaction_features(&self, request: &TransactionRiskRequest) -> Result<FeatureVector, ScoringError>;

    async fn contract_features(&self, address: &str, chain_id: u64) -> Result<FeatureVector, ScoringError>;
}

/// Provider that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralFeatureProvider;

#[async_trait]
impl FeatureProvider for NeutralFeatureProvider {
    async fn transaction_features(&self, _request: &TransactionRiskRequest) -> Result<FeatureVector, ScoringError> {
        Ok(FeatureVector::new())
    }

    async fn contract_features(&self, _address: &str, _chain_id: u64) -> Result<FeatureVector, ScoringError> {
        Ok(FeatureVector::new())
    }
}

/// In-memory provider fed by the embedding application, e.g. from an
/// offline feature pipeline. Transaction features are keyed by sender.
#[derive(Debug, Default)]
pub struct StaticFeatureProvider {
    contracts: RwLock<HashMap<AddressKey, FeatureVector>>,
    senders: RwLock<HashMap<AddressKey, FeatureVector>>,
}

impl StaticFeatureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_contract_features(&self, address: &str, chain_id: u64, features: FeatureVector) {
        if let Ok(mut contracts) = self.contracts.write() {
            contracts.insert(AddressKey::new(address, chain_id), features);
        }
    }

    pub fn set_sender_features(&self, address: &str, chain_id: u64, features: FeatureVector) {
        if let Ok(mut senders) = self.senders.write() {
            senders.insert(AddressKey::new(address, chain_id), features);
        }
    }

    fn lookup(map: &RwLock<HashMap<AddressKey, FeatureVector>>, key: &AddressKey) -> Result<FeatureVector, ScoringError> {
        let guard = map.read().map_err(|_| ScoringError::FeatureUnavailable {
            target: key.address.clone(),
            message: "feature store lock poisoned".to_string(),
        })?;
        Ok(guard.get(key).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl FeatureProvider for StaticFeatureProvider {
    async fn transaction_features(&self, request: &TransactionRiskRequest) -> Result<FeatureVector, ScoringError> {
        Self::lookup(&self.senders, &AddressKey::new(&request.from_address, request.chain_id))
    }

    async fn contract_features(&self, address: &str, chain_id: u64) -> Result<FeatureVector, ScoringError> {
        Self::lookup(&self.contracts, &AddressKey::new(address, chain_id))
    }
}
