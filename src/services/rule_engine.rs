use tracing::{debug, warn};

use crate::models::{AlertCondition, AlertRule, ConditionType, RiskAssessment};

/// Evaluates alert rules against assessments. Stateless; cooldown and
/// enablement are the caller's concern.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    /// True when every condition holds. A rule without conditions always
    /// matches.
    pub fn evaluate(&self, rule: &AlertRule, assessment: &RiskAssessment) -> bool {
        let matched = rule
            .conditions
            .iter()
            .all(|condition| self.condition_holds(&rule.id, condition, assessment));

        debug!(rule = %rule.id, risk_score = assessment.risk_score, matched, "Rule evaluated");
        matched
    }

    pub fn condition_holds(&self, rule_id: &str, condition: &AlertCondition, assessment: &RiskAssessment) -> bool {
        let value = match condition.condition_type {
            ConditionType::RiskScore => f64::from(assessment.risk_score),
            ConditionType::SafetyGrade => assessment.safety_grade.ordinal(),
            ConditionType::LiquidityChange | ConditionType::PriceChange | ConditionType::LargeTransfer => {
                debug!(rule = %rule_id, condition = ?condition.condition_type, "Condition type not evaluated yet");
                return false;
            }
            ConditionType::Unknown => {
                warn!(rule = %rule_id, "Unknown condition type, treating as not met");
                return false;
            }
        };

        match condition.operator.compare(value, condition.threshold) {
            Some(result) => result,
            None => {
                warn!(rule = %rule_id, operator = ?condition.operator, "Unknown comparison operator, treating as not met");
                false
            }
        }
    }
}
