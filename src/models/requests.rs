use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::utils::fingerprint::fingerprint;

/// Transaction risk request. Amount is in native units, gas price in gwei.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRiskRequest {
    pub from_address: String,
    pub to_address: Option<String>,
    pub amount: f64,
    pub chain_id: u64,
    pub gas_price_gwei: Option<f64>,
    pub gas_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRiskRequest {
    pub contract_address: String,
    pub chain_id: u64,
    #[serde(default)]
    pub check_honeypot: bool,
    #[serde(default)]
    pub check_rug_pull: bool,
    #[serde(default)]
    pub check_vulnerabilities: bool,
    #[serde(default = "default_true")]
    pub use_ml_models: bool,
}

fn default_true() -> bool {
    true
}

impl TransactionRiskRequest {
    pub fn new(from_address: &str, to_address: Option<&str>, amount: f64, chain_id: u64) -> Self {
        Self {
            from_address: from_address.to_string(),
            to_address: to_address.map(str::to_string),
            amount,
            chain_id,
            gas_price_gwei: None,
            gas_limit: None,
        }
    }

    pub fn with_gas(mut self, gas_price_gwei: f64, gas_limit: u64) -> Self {
        self.gas_price_gwei = Some(gas_price_gwei);
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.from_address.trim().is_empty() {
            return Err(AppError::ValidationError("from_address must not be empty".to_string()));
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(AppError::ValidationError(format!("invalid amount: {}", self.amount)));
        }
        Ok(())
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&[
            "transaction",
            &self.from_address.to_lowercase(),
            &self.to_address.as_deref().unwrap_or("").to_lowercase(),
            &self.amount.to_string(),
            &self.chain_id.to_string(),
            &self.gas_price_gwei.map(|g| g.to_string()).unwrap_or_default(),
            &self.gas_limit.map(|g| g.to_string()).unwrap_or_default(),
        ])
    }
}

impl ContractRiskRequest {
    pub fn new(contract_address: &str, chain_id: u64) -> Self {
        Self {
            contract_address: contract_address.to_string(),
            chain_id,
            check_honeypot: false,
            check_rug_pull: false,
            check_vulnerabilities: false,
            use_ml_models: true,
        }
    }

    /// Request used by the monitor for every contract it sweeps.
    pub fn for_monitoring(contract_address: &str, chain_id: u64) -> Self {
        Self {
            check_rug_pull: true,
            use_ml_models: true,
            ..Self::new(contract_address, chain_id)
        }
    }

    pub fn with_honeypot_check(mut self) -> Self {
        self.check_honeypot = true;
        self
    }

    pub fn with_rug_pull_check(mut self) -> Self {
        self.check_rug_pull = true;
        self
    }

    pub fn with_vulnerability_scan(mut self) -> Self {
        self.check_vulnerabilities = true;
        self
    }

    pub fn without_models(mut self) -> Self {
        self.use_ml_models = false;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.contract_address.trim().is_empty() {
            return Err(AppError::ValidationError("contract_address must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn fingerprint(&self) -> String {
        let flag = |b: bool| if b { "1" } else { "0" };
        fingerprint(&[
            "contract",
            &self.contract_address.to_lowercase(),
            &self.chain_id.to_string(),
            flag(self.check_honeypot),
            flag(self.check_rug_pull),
            flag(self.check_vulnerabilities),
            flag(self.use_ml_models),
        ])
    }
}
