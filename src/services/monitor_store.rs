use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::AppError;
use crate::models::{AddressKey, AddressKind, AlertRule, MonitoredAddress};

/// Monitored addresses and alert rules. Callers wrap it in a single lock so
/// both sets always change together.
#[derive(Debug, Default)]
pub struct MonitorStore {
    addresses: HashMap<AddressKey, MonitoredAddress>,
    rules: HashMap<String, AlertRule>,
}

impl MonitorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<AlertRule>) -> Result<Self, AppError> {
        let mut store = Self::new();
        for rule in rules {
            store.add_rule(rule)?;
        }
        Ok(store)
    }

    pub fn add_address(&mut self, address: MonitoredAddress) -> Result<(), AppError> {
        let key = address.key();
        if self.addresses.contains_key(&key) {
            return Err(AppError::AlreadyExists(format!(
                "address {} is already monitored on chain {}",
                address.address, address.chain_id
            )));
        }
        self.addresses.insert(key, address);
        Ok(())
    }

    pub fn remove_address(&mut self, address: &str, chain_id: u64) -> Result<MonitoredAddress, AppError> {
        self.addresses
            .remove(&AddressKey::new(address, chain_id))
            .ok_or_else(|| AppError::NotFound(format!("address {} is not monitored on chain {}", address, chain_id)))
    }

    pub fn address(&self, key: &AddressKey) -> Option<&MonitoredAddress> {
        self.addresses.get(key)
    }

    pub fn address_count(&self) -> usize {
        self.addresses.len()
    }

    /// Owned copies in key order, so work can proceed without the lock.
    pub fn snapshot_addresses(&self) -> Vec<MonitoredAddress> {
        let mut entries: Vec<(&AddressKey, &MonitoredAddress)> = self.addresses.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, address)| address.clone()).collect()
    }

    /// Returns false when the address was removed since it was snapshotted.
    pub fn record_check(&mut self, key: &AddressKey, kind: AddressKind, risk_score: Option<u8>, checked_at: DateTime<Utc>) -> bool {
        match self.addresses.get_mut(key) {
            Some(address) => {
                address.kind = Some(kind);
                address.last_checked = Some(checked_at);
                if risk_score.is_some() {
                    address.last_risk_score = risk_score;
                }
                true
            }
            None => false,
        }
    }

    pub fn add_rule(&mut self, rule: AlertRule) -> Result<(), AppError> {
        rule.validate()?;
        if self.rules.contains_key(&rule.id) {
            return Err(AppError::AlreadyExists(format!("alert rule {} already exists", rule.id)));
        }
        self.rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    pub fn rule(&self, id: &str) -> Option<&AlertRule> {
        self.rules.get(id)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> Vec<AlertRule> {
        let mut rules: Vec<AlertRule> = self.rules.values().cloned().collect();
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        rules
    }

    /// Marks the rule as fired at `now` if it is enabled and out of cooldown.
    /// Exactly one caller wins a claim for a given cooldown period.
    pub fn claim_rule(&mut self, id: &str, now: DateTime<Utc>) -> Option<AlertRule> {
        let rule = self.rules.get_mut(id)?;
        if !rule.enabled || rule.in_cooldown(now) {
            return None;
        }
        rule.last_triggered = Some(now);
        Some(rule.clone())
    }
}
