use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ActionType, AlertPriority, AlertRule, MonitoredAddress, RiskAssessment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Triggered,
    Acknowledged,
    Resolved,
    Suppressed,
}

impl AlertStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Suppressed)
    }
}

/// Outcome of executing one alert action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_type: ActionType,
    pub channel: String,
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub rule_id: String,
    pub rule_name: String,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
    pub address: String,
    pub chain_id: u64,
    pub user_id: String,
    pub assessment: serde_json::Value,
    pub triggered_at: DateTime<Utc>,
    pub status: AlertStatus,
    pub action_results: Vec<ActionResult>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(rule: &AlertRule, target: &MonitoredAddress, assessment: &RiskAssessment, triggered_at: DateTime<Utc>) -> Self {
        let title = format!("{}: {} on chain {}", rule.name, target.address, target.chain_id);
        let message = format!(
            "Address {} on chain {} scored {} (grade {}, {} risk, confidence {:.2})",
            target.address,
            target.chain_id,
            assessment.risk_score,
            assessment.safety_grade,
            assessment.risk_level,
            assessment.confidence
        );

        Self {
            id: Uuid::new_v4(),
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            priority: rule.priority,
            title,
            message,
            address: target.address.clone(),
            chain_id: target.chain_id,
            user_id: target.user_id.clone(),
            assessment: assessment.snapshot(),
            triggered_at,
            status: AlertStatus::Triggered,
            action_results: Vec::new(),
            resolved_at: None,
        }
    }

    pub fn record_action(&mut self, action_type: ActionType, channel: &str, success: bool, message: impl Into<String>) {
        self.action_results.push(ActionResult {
            action_type,
            channel: channel.to_string(),
            success,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn successful_actions(&self) -> usize {
        self.action_results.iter().filter(|r| r.success).count()
    }

    pub fn acknowledge(&mut self) -> Result<(), AppError> {
        match self.status {
            AlertStatus::Triggered => {
                self.status = AlertStatus::Acknowledged;
                Ok(())
            }
            other => Err(self.transition_error(other, AlertStatus::Acknowledged)),
        }
    }

    pub fn resolve(&mut self) -> Result<(), AppError> {
        self.close(AlertStatus::Resolved)
    }

    pub fn suppress(&mut self) -> Result<(), AppError> {
        self.close(AlertStatus::Suppressed)
    }

    fn close(&mut self, to: AlertStatus) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(self.transition_error(self.status, to));
        }
        self.status = to;
        self.resolved_at = Some(Utc::now());
        Ok(())
    }

    fn transition_error(&self, from: AlertStatus, to: AlertStatus) -> AppError {
        AppError::InvalidStateTransition(format!("alert {} cannot move from {:?} to {:?}", self.id, from, to))
    }
}
