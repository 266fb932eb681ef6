use address_risk_monitor::{
    models::{
        AlertCondition, AlertPriority, AlertRule, ComparisonOperator, RiskFactor, RiskLevel, SafetyGrade,
    },
    services::{aggregate_assessment, Findings, RuleEngine},
};
use chrono::Utc;
use proptest::prelude::*;
use std::time::Duration;

fn risk_factor() -> impl Strategy<Value = RiskFactor> {
    (-1.0f64..2.0, 0.0f64..1.0).prop_map(|(impact, weight)| RiskFactor::new("generated", "generated factor", impact, weight))
}

fn operator() -> impl Strategy<Value = ComparisonOperator> {
    prop_oneof![
        Just(ComparisonOperator::GreaterThan),
        Just(ComparisonOperator::GreaterThanOrEqual),
        Just(ComparisonOperator::LessThan),
        Just(ComparisonOperator::LessThanOrEqual),
        Just(ComparisonOperator::Equal),
        Just(ComparisonOperator::NotEqual),
    ]
}

fn expected_bands(score: u8) -> (SafetyGrade, RiskLevel) {
    match score {
        90..=100 => (SafetyGrade::F, RiskLevel::Critical),
        80..=89 => (SafetyGrade::D, RiskLevel::High),
        70..=79 => (SafetyGrade::C, RiskLevel::High),
        60..=69 => (SafetyGrade::C, RiskLevel::Medium),
        40..=59 => (SafetyGrade::B, RiskLevel::Medium),
        20..=39 => (SafetyGrade::B, RiskLevel::Low),
        _ => (SafetyGrade::A, RiskLevel::VeryLow),
    }
}

proptest! {
    /// Score, grade, level, confidence and recommendations always agree.
    #[test]
    fn test_assessment_fields_are_consistent(factors in prop::collection::vec(risk_factor(), 0..12)) {
        let findings = Findings { factors, ..Default::default() };
        let assessment = aggregate_assessment("0xabc", 1, findings, 5.0, Utc::now(), Duration::from_secs(300));

        prop_assert!(assessment.risk_score <= 100);
        let (grade, level) = expected_bands(assessment.risk_score);
        prop_assert_eq!(assessment.safety_grade, grade);
        prop_assert_eq!(assessment.risk_level, level);
        prop_assert!(assessment.confidence >= 0.1 && assessment.confidence <= 1.0);
        prop_assert_eq!(assessment.recommendations.clone(), level.recommendations());
        prop_assert!(assessment.expires_at > assessment.assessed_at);
    }

    /// Factors with non-positive total weight behave like no factors at all.
    #[test]
    fn test_weightless_factors_score_zero(impacts in prop::collection::vec(-1.0f64..2.0, 1..8)) {
        let factors = impacts.into_iter().map(|i| RiskFactor::new("weightless", "", i, 0.0)).collect();
        let assessment = aggregate_assessment("0xabc", 1, Findings { factors, ..Default::default() }, 5.0, Utc::now(), Duration::from_secs(300));

        prop_assert_eq!(assessment.risk_score, 0);
        prop_assert_eq!(assessment.confidence, 1.0);
        prop_assert_eq!(assessment.safety_grade, SafetyGrade::A);
    }

    /// A rule fires exactly when every one of its conditions holds.
    #[test]
    fn test_rule_fires_iff_all_conditions_hold(
        score in 0u8..=100,
        conditions in prop::collection::vec((operator(), 0u8..=100), 0..5),
    ) {
        let findings = Findings::new().with_factor(RiskFactor::new("fixed", "", f64::from(score) / 100.0, 1.0));
        let assessment = aggregate_assessment("0xabc", 1, findings, 5.0, Utc::now(), Duration::from_secs(300));
        prop_assume!(assessment.risk_score == score);

        let mut rule = AlertRule::new("generated", "Generated", AlertPriority::Medium, chrono::Duration::zero());
        for (op, threshold) in &conditions {
            rule = rule.with_condition(AlertCondition::risk_score(*op, f64::from(*threshold)));
        }

        let expected = conditions.iter().all(|(op, threshold)| {
            let (s, t) = (score, *threshold);
            match op {
                ComparisonOperator::GreaterThan => s > t,
                ComparisonOperator::GreaterThanOrEqual => s >= t,
                ComparisonOperator::LessThan => s < t,
                ComparisonOperator::LessThanOrEqual => s <= t,
                ComparisonOperator::Equal => s == t,
                ComparisonOperator::NotEqual => s != t,
                ComparisonOperator::Unknown => false,
            }
        });

        prop_assert_eq!(RuleEngine::new().evaluate(&rule, &assessment), expected);
    }
}
