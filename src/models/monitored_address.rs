use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AppError;

// Loose on purpose: chains differ in address encoding, only the 0x shape is enforced.
static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9A-Za-z]{1,64}$").expect("address pattern is valid"));

pub fn validate_address(address: &str) -> Result<(), AppError> {
    if ADDRESS_PATTERN.is_match(address.trim()) {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!("invalid address format: {:?}", address)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    Contract,
    Account,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredAddress {
    pub address: String,
    pub chain_id: u64,
    pub user_id: String,
    pub rule_ids: Vec<String>,
    pub kind: Option<AddressKind>,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_risk_score: Option<u8>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Store key: addresses compare case-insensitively within a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressKey {
    pub address: String,
    pub chain_id: u64,
}

impl AddressKey {
    pub fn new(address: &str, chain_id: u64) -> Self {
        Self {
            address: address.trim().to_lowercase(),
            chain_id,
        }
    }
}

impl MonitoredAddress {
    pub fn new(address: &str, chain_id: u64, user_id: &str, rule_ids: Vec<String>) -> Self {
        Self {
            address: address.trim().to_string(),
            chain_id,
            user_id: user_id.to_string(),
            rule_ids,
            kind: None,
            last_checked: None,
            last_risk_score: None,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> AddressKey {
        AddressKey::new(&self.address, self.chain_id)
    }

    /// True when the address was checked less than `window` before `now`.
    pub fn checked_within(&self, window: chrono::Duration, now: DateTime<Utc>) -> bool {
        match self.last_checked {
            Some(checked) => now - checked < window,
            None => false,
        }
    }
}
