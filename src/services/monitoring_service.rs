use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::MonitorSettings;
use crate::error::AppError;
use crate::models::{
    validate_address, AddressKey, AddressKind, Alert, AlertRule, ContractRiskRequest, MonitoredAddress,
    RiskAssessment, TransactionRiskRequest,
};
use crate::services::alert_service::AlertDispatcher;
use crate::services::blockchain_service::ChainReader;
use crate::services::monitor_store::MonitorStore;
use crate::services::risk_scorer::RiskScorer;
use crate::services::rule_engine::RuleEngine;
use crate::utils::time::{now_utc, seconds_until};

/// Outcome of one pass over the monitored addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub checked: usize,
    pub skipped: usize,
    pub failed: usize,
    pub alerts_fired: usize,
    pub interrupted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoringStats {
    pub running: bool,
    pub monitored_addresses: usize,
    pub alert_rules: usize,
    pub sweeps_completed: u64,
    pub addresses_checked: u64,
    pub alerts_fired: u64,
    pub last_sweep: Option<DateTime<Utc>>,
    pub last_summary: Option<SweepSummary>,
}

/// Continuous monitoring of registered addresses.
///
/// A background task sweeps every address on a fixed interval, scores
/// contracts, evaluates each address's rules and dispatches alerts. The
/// address and rule sets live behind one lock that is never held across
/// chain, scoring or dispatch calls.
pub struct MonitoringService {
    settings: MonitorSettings,
    store: RwLock<MonitorStore>,
    chain: Arc<dyn ChainReader>,
    scorer: Arc<RiskScorer>,
    rule_engine: RuleEngine,
    dispatcher: AlertDispatcher,
    alert_history: RwLock<VecDeque<Alert>>,
    alert_tx: broadcast::Sender<Alert>,
    shutdown_tx: broadcast::Sender<()>,
    running: AtomicBool,
    generation: AtomicU64,
    sweeps_completed: AtomicU64,
    addresses_checked: AtomicU64,
    alerts_fired: AtomicU64,
    last_sweep: RwLock<Option<DateTime<Utc>>>,
    last_summary: RwLock<Option<SweepSummary>>,
}

impl MonitoringService {
    pub fn new(
        settings: MonitorSettings,
        chain: Arc<dyn ChainReader>,
        scorer: Arc<RiskScorer>,
        dispatcher: AlertDispatcher,
        rules: Vec<AlertRule>,
    ) -> Result<Self, AppError> {
        let store = MonitorStore::with_rules(rules)?;
        let (alert_tx, _) = broadcast::channel(settings.alert_channel_capacity.max(1));
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            settings,
            store: RwLock::new(store),
            chain,
            scorer,
            rule_engine: RuleEngine::new(),
            dispatcher,
            alert_history: RwLock::new(VecDeque::new()),
            alert_tx,
            shutdown_tx,
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            sweeps_completed: AtomicU64::new(0),
            addresses_checked: AtomicU64::new(0),
            alerts_fired: AtomicU64::new(0),
            last_sweep: RwLock::new(None),
            last_summary: RwLock::new(None),
        })
    }

    pub fn scorer(&self) -> &Arc<RiskScorer> {
        &self.scorer
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawn the sweep loop and return immediately.
    pub fn start(self: &Arc<Self>) -> Result<(), AppError> {
        if self.running.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Err(AppError::InvalidStateTransition("monitor is already running".to_string()));
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let service = Arc::clone(self);

        info!(
            interval_seconds = self.settings.sweep_interval_seconds,
            recheck_window_seconds = self.settings.recheck_window_seconds,
            "Starting address monitoring"
        );

        tokio::spawn(async move {
            let mut interval = time::interval(service.settings.sweep_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => {
                        if !service.is_current(generation) {
                            break;
                        }
                        service.run_sweep(now_utc(), Some(generation)).await;
                    }
                }
            }

            info!(generation, "Monitoring loop exited");
        });

        Ok(())
    }

    /// Signal the loop to stop. Does not wait for an in-flight address check.
    pub fn stop(&self) -> Result<(), AppError> {
        if self.running.compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Err(AppError::InvalidStateTransition("monitor is not running".to_string()));
        }
        // No receivers just means the loop already exited.
        let _ = self.shutdown_tx.send(());
        info!("Stopping address monitoring");
        Ok(())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.is_running() && self.generation.load(Ordering::Acquire) == generation
    }

    pub async fn sweep_once(&self) -> SweepSummary {
        self.sweep_at(now_utc()).await
    }

    /// Run one sweep as if the clock read `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepSummary {
        self.run_sweep(now, None).await
    }

    async fn run_sweep(&self, now: DateTime<Utc>, generation: Option<u64>) -> SweepSummary {
        let targets = self.store.read().await.snapshot_addresses();
        let window = self.settings.recheck_window();
        let mut summary = SweepSummary::default();

        debug!(addresses = targets.len(), "Starting sweep");

        for target in &targets {
            if let Some(generation) = generation {
                if !self.is_current(generation) {
                    info!("Sweep interrupted by shutdown");
                    summary.interrupted = true;
                    break;
                }
            }

            if target.checked_within(window, now) {
                summary.skipped += 1;
                continue;
            }

            match self.check_address(target, now).await {
                Ok(fired) => {
                    summary.checked += 1;
                    summary.alerts_fired += fired;
                }
                Err(e) => {
                    warn!(address = %target.address, chain_id = target.chain_id, error = %e, "Address check failed, will retry next sweep");
                    summary.failed += 1;
                }
            }
        }

        self.sweeps_completed.fetch_add(1, Ordering::Relaxed);
        self.addresses_checked.fetch_add(summary.checked as u64, Ordering::Relaxed);
        *self.last_sweep.write().await = Some(now);
        *self.last_summary.write().await = Some(summary);

        counter!("risk_monitor_sweeps_total", 1);
        counter!("risk_monitor_address_checks_failed_total", summary.failed as u64);
        gauge!("risk_monitor_addresses", targets.len() as f64);

        info!(
            checked = summary.checked,
            skipped = summary.skipped,
            failed = summary.failed,
            alerts = summary.alerts_fired,
            "Sweep completed"
        );
        summary
    }

    /// Classify, score and evaluate one address. Returns the number of alerts fired.
    async fn check_address(&self, target: &MonitoredAddress, now: DateTime<Utc>) -> Result<usize, AppError> {
        let code = self.chain.get_code(&target.address, target.chain_id).await?;
        let key = target.key();

        if code.is_empty() {
            self.store.write().await.record_check(&key, AddressKind::Account, None, now);
            debug!(address = %target.address, chain_id = target.chain_id, "Address is an account, not scored");
            return Ok(0);
        }

        let request = ContractRiskRequest::for_monitoring(&target.address, target.chain_id);
        let assessment = self.scorer.assess_contract_risk(&request).await?;

        let still_monitored = self
            .store
            .write()
            .await
            .record_check(&key, AddressKind::Contract, Some(assessment.risk_score), now);
        if !still_monitored {
            debug!(address = %target.address, "Address removed during sweep, dropping result");
            return Ok(0);
        }

        let mut fired = 0;
        for rule_id in &target.rule_ids {
            if self.evaluate_rule(rule_id, target, &assessment, now).await {
                fired += 1;
            }
        }
        Ok(fired)
    }

    async fn evaluate_rule(&self, rule_id: &str, target: &MonitoredAddress, assessment: &RiskAssessment, now: DateTime<Utc>) -> bool {
        let rule = match self.store.read().await.rule(rule_id) {
            Some(rule) => rule.clone(),
            None => {
                debug!(rule = %rule_id, address = %target.address, "Unknown rule id, skipping");
                return false;
            }
        };

        if !rule.enabled {
            return false;
        }
        if let Some(last) = rule.last_triggered.filter(|_| rule.in_cooldown(now)) {
            debug!(
                rule = %rule.id,
                remaining_seconds = seconds_until(
                    last.checked_add_signed(rule.cooldown()).unwrap_or(DateTime::<Utc>::MAX_UTC),
                    now
                ),
                "Rule cooling down"
            );
            return false;
        }
        if !self.rule_engine.evaluate(&rule, assessment) {
            return false;
        }

        // Another sweep may have fired the rule since the read above.
        let Some(rule) = self.store.write().await.claim_rule(rule_id, now) else {
            return false;
        };

        let mut alert = Alert::new(&rule, target, assessment, now);
        let delivered = self.dispatcher.dispatch(&mut alert, &rule.actions).await;
        if delivered == 0 && !rule.actions.is_empty() {
            error!(alert_id = %alert.id, rule = %rule.id, "Alert could not be delivered on any channel");
        }
        self.record_alert(alert).await;
        true
    }

    async fn record_alert(&self, alert: Alert) {
        info!(
            alert_id = %alert.id,
            rule = %alert.rule_id,
            address = %alert.address,
            priority = %alert.priority,
            "Alert fired"
        );

        {
            let mut history = self.alert_history.write().await;
            history.push_back(alert.clone());
            while history.len() > self.settings.alert_history_limit {
                history.pop_front();
            }
        }

        self.alerts_fired.fetch_add(1, Ordering::Relaxed);
        counter!("risk_monitor_alerts_fired_total", 1, "priority" => alert.priority.to_string());
        // No subscribers is fine.
        let _ = self.alert_tx.send(alert);
    }

    pub async fn add_monitored_address(
        &self,
        address: &str,
        chain_id: u64,
        user_id: &str,
        rule_ids: Vec<String>,
    ) -> Result<MonitoredAddress, AppError> {
        validate_address(address)?;

        let monitored = MonitoredAddress::new(address, chain_id, user_id, rule_ids);
        {
            let mut store = self.store.write().await;
            for rule_id in &monitored.rule_ids {
                if store.rule(rule_id).is_none() {
                    warn!(rule = %rule_id, address = %address, "Address references an unknown rule");
                }
            }
            store.add_address(monitored.clone())?;
        }

        info!(address = %address, chain_id, user_id = %user_id, "Address added to monitoring");
        Ok(monitored)
    }

    pub async fn remove_monitored_address(&self, address: &str, chain_id: u64) -> Result<MonitoredAddress, AppError> {
        let removed = self.store.write().await.remove_address(address, chain_id)?;
        info!(address = %address, chain_id, "Address removed from monitoring");
        Ok(removed)
    }

    pub async fn add_alert_rule(&self, rule: AlertRule) -> Result<(), AppError> {
        let rule_id = rule.id.clone();
        self.store.write().await.add_rule(rule)?;
        info!(rule = %rule_id, "Alert rule added");
        Ok(())
    }

    pub async fn monitored_addresses(&self) -> Vec<MonitoredAddress> {
        self.store.read().await.snapshot_addresses()
    }

    pub async fn get_monitored_address(&self, address: &str, chain_id: u64) -> Option<MonitoredAddress> {
        self.store.read().await.address(&AddressKey::new(address, chain_id)).cloned()
    }

    pub async fn alert_rules(&self) -> Vec<AlertRule> {
        self.store.read().await.rules()
    }

    /// Most recent alerts first.
    pub async fn recent_alerts(&self, limit: usize) -> Vec<Alert> {
        self.alert_history.read().await.iter().rev().take(limit).cloned().collect()
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<Alert> {
        self.alert_tx.subscribe()
    }

    pub async fn acknowledge_alert(&self, alert_id: Uuid) -> Result<Alert, AppError> {
        self.update_alert(alert_id, Alert::acknowledge).await
    }

    pub async fn resolve_alert(&self, alert_id: Uuid) -> Result<Alert, AppError> {
        self.update_alert(alert_id, Alert::resolve).await
    }

    async fn update_alert<F>(&self, alert_id: Uuid, transition: F) -> Result<Alert, AppError>
    where
        F: FnOnce(&mut Alert) -> Result<(), AppError>,
    {
        let mut history = self.alert_history.write().await;
        let alert = history
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| AppError::NotFound(format!("alert {} not found", alert_id)))?;
        transition(alert)?;
        Ok(alert.clone())
    }

    pub async fn stats(&self) -> MonitoringStats {
        let (monitored_addresses, alert_rules) = {
            let store = self.store.read().await;
            (store.address_count(), store.rule_count())
        };

        MonitoringStats {
            running: self.is_running(),
            monitored_addresses,
            alert_rules,
            sweeps_completed: self.sweeps_completed.load(Ordering::Relaxed),
            addresses_checked: self.addresses_checked.load(Ordering::Relaxed),
            alerts_fired: self.alerts_fired.load(Ordering::Relaxed),
            last_sweep: *self.last_sweep.read().await,
            last_summary: *self.last_summary.read().await,
        }
    }

    pub async fn assess_transaction_risk(&self, request: &TransactionRiskRequest) -> Result<RiskAssessment, AppError> {
        self.scorer.assess_transaction_risk(request).await
    }

    pub async fn assess_contract_risk(&self, request: &ContractRiskRequest) -> Result<RiskAssessment, AppError> {
        self.scorer.assess_contract_risk(request).await
    }
}
