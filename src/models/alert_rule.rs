use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppError;
use crate::utils::time::{self, MAX_DURATION_SECONDS};

pub const HIGH_RISK_SCORE_RULE: &str = "high_risk_score";
pub const CRITICAL_RISK_SCORE_RULE: &str = "critical_risk_score";
pub const FAILING_GRADE_RULE: &str = "failing_safety_grade";
pub const MODERATE_RISK_RULE: &str = "moderate_risk_score";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertPriority::Critical => "critical",
            AlertPriority::High => "high",
            AlertPriority::Medium => "medium",
            AlertPriority::Low => "low",
            AlertPriority::Info => "info",
        };
        write!(f, "{}", name)
    }
}

/// Signal a condition reads off an assessment. Reserved variants are accepted
/// in configuration but do not evaluate yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    RiskScore,
    SafetyGrade,
    LiquidityChange,
    PriceChange,
    LargeTransfer,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(other)]
    Unknown,
}

impl ComparisonOperator {
    pub fn parse(symbol: &str) -> Self {
        match symbol.trim() {
            ">" => ComparisonOperator::GreaterThan,
            ">=" => ComparisonOperator::GreaterThanOrEqual,
            "<" => ComparisonOperator::LessThan,
            "<=" => ComparisonOperator::LessThanOrEqual,
            "==" => ComparisonOperator::Equal,
            "!=" => ComparisonOperator::NotEqual,
            _ => ComparisonOperator::Unknown,
        }
    }

    /// `None` for an unknown operator.
    pub fn compare(&self, value: f64, threshold: f64) -> Option<bool> {
        let result = match self {
            ComparisonOperator::GreaterThan => value > threshold,
            ComparisonOperator::GreaterThanOrEqual => value >= threshold,
            ComparisonOperator::LessThan => value < threshold,
            ComparisonOperator::LessThanOrEqual => value <= threshold,
            ComparisonOperator::Equal => (value - threshold).abs() < f64::EPSILON,
            ComparisonOperator::NotEqual => (value - threshold).abs() >= f64::EPSILON,
            ComparisonOperator::Unknown => return None,
        };
        Some(result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertCondition {
    pub condition_type: ConditionType,
    pub operator: ComparisonOperator,
    pub threshold: f64,
}

impl AlertCondition {
    pub fn new(condition_type: ConditionType, operator: ComparisonOperator, threshold: f64) -> Self {
        Self {
            condition_type,
            operator,
            threshold,
        }
    }

    pub fn risk_score(operator: ComparisonOperator, threshold: f64) -> Self {
        Self::new(ConditionType::RiskScore, operator, threshold)
    }

    pub fn safety_grade(operator: ComparisonOperator, threshold: f64) -> Self {
        Self::new(ConditionType::SafetyGrade, operator, threshold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Log,
    Webhook,
    Email,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionType::Log => "log",
            ActionType::Webhook => "webhook",
            ActionType::Email => "email",
            ActionType::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// A delivery step. `target` overrides the channel's configured destination
/// (webhook URL, email recipient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertAction {
    pub action_type: ActionType,
    #[serde(default)]
    pub target: Option<String>,
}

impl AlertAction {
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            target: None,
        }
    }

    pub fn log() -> Self {
        Self::new(ActionType::Log)
    }

    pub fn webhook(url: Option<&str>) -> Self {
        Self {
            action_type: ActionType::Webhook,
            target: url.map(str::to_string),
        }
    }

    pub fn email(recipient: Option<&str>) -> Self {
        Self {
            action_type: ActionType::Email,
            target: recipient.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub conditions: Vec<AlertCondition>,
    pub actions: Vec<AlertAction>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub priority: AlertPriority,
    pub cooldown_seconds: u64,
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

impl AlertRule {
    pub fn new(id: &str, name: &str, priority: AlertPriority, cooldown: chrono::Duration) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            conditions: Vec::new(),
            actions: Vec::new(),
            enabled: true,
            priority,
            cooldown_seconds: cooldown.num_seconds().max(0) as u64,
            last_triggered: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_condition(mut self, condition: AlertCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_action(mut self, action: AlertAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn cooldown(&self) -> chrono::Duration {
        time::seconds(self.cooldown_seconds)
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.last_triggered {
            Some(triggered) => now.signed_duration_since(triggered) < self.cooldown(),
            None => false,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.id.trim().is_empty() {
            return Err(AppError::ValidationError("alert rule id must not be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::ValidationError(format!("alert rule {} has no name", self.id)));
        }
        if self.cooldown_seconds > MAX_DURATION_SECONDS {
            return Err(AppError::ValidationError(format!(
                "alert rule {} cooldown exceeds {} seconds",
                self.id, MAX_DURATION_SECONDS
            )));
        }
        if self.conditions.iter().any(|c| !c.threshold.is_finite()) {
            return Err(AppError::ValidationError(format!("alert rule {} has a non-finite threshold", self.id)));
        }
        Ok(())
    }
}

/// Built-in rule set handed to the monitor at construction time.
pub fn default_alert_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::new(HIGH_RISK_SCORE_RULE, "High risk score", AlertPriority::High, chrono::Duration::minutes(15))
            .with_description("Risk score rose above 70")
            .with_condition(AlertCondition::risk_score(ComparisonOperator::GreaterThan, 70.0))
            .with_action(AlertAction::log())
            .with_action(AlertAction::webhook(None)),
        AlertRule::new(CRITICAL_RISK_SCORE_RULE, "Critical risk score", AlertPriority::Critical, chrono::Duration::minutes(5))
            .with_description("Risk score reached the critical band")
            .with_condition(AlertCondition::risk_score(ComparisonOperator::GreaterThanOrEqual, 90.0))
            .with_action(AlertAction::log())
            .with_action(AlertAction::webhook(None))
            .with_action(AlertAction::email(None)),
        AlertRule::new(FAILING_GRADE_RULE, "Failing safety grade", AlertPriority::High, chrono::Duration::minutes(30))
            .with_description("Safety grade dropped to D or F")
            .with_condition(AlertCondition::safety_grade(ComparisonOperator::LessThanOrEqual, 2.0))
            .with_action(AlertAction::log()),
        AlertRule::new(MODERATE_RISK_RULE, "Moderate risk score", AlertPriority::Medium, chrono::Duration::hours(1))
            .with_description("Risk score in the medium band")
            .with_condition(AlertCondition::risk_score(ComparisonOperator::GreaterThanOrEqual, 40.0))
            .with_condition(AlertCondition::risk_score(ComparisonOperator::LessThan, 70.0))
            .with_action(AlertAction::log()),
    ]
}
