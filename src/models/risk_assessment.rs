use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// One contributing signal inside an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor_type: String,
    pub description: String,
    pub impact: f64,
    pub weight: f64,
    pub evidence: String,
}

impl RiskFactor {
    pub fn new(factor_type: &str, description: impl Into<String>, impact: f64, weight: f64) -> Self {
        Self {
            factor_type: factor_type.to_string(),
            description: description.into(),
            impact,
            weight,
            evidence: String::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }

    /// Impact as used by aggregation: negative values count as zero.
    pub fn effective_impact(&self) -> f64 {
        self.impact.max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SafetyGrade {
    A,
    B,
    C,
    D,
    F,
}

impl SafetyGrade {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => SafetyGrade::F,
            80..=89 => SafetyGrade::D,
            60..=79 => SafetyGrade::C,
            20..=59 => SafetyGrade::B,
            _ => SafetyGrade::A,
        }
    }

    /// Ordinal used by rule conditions: A=5 down to F=1.
    pub fn ordinal(&self) -> f64 {
        match self {
            SafetyGrade::A => 5.0,
            SafetyGrade::B => 4.0,
            SafetyGrade::C => 3.0,
            SafetyGrade::D => 2.0,
            SafetyGrade::F => 1.0,
        }
    }
}

impl fmt::Display for SafetyGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            SafetyGrade::A => "A",
            SafetyGrade::B => "B",
            SafetyGrade::C => "C",
            SafetyGrade::D => "D",
            SafetyGrade::F => "F",
        };
        write!(f, "{}", letter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => RiskLevel::Critical,
            70..=89 => RiskLevel::High,
            40..=69 => RiskLevel::Medium,
            20..=39 => RiskLevel::Low,
            _ => RiskLevel::VeryLow,
        }
    }

    pub fn recommendations(&self) -> Vec<String> {
        let lines: &[&str] = match self {
            RiskLevel::Critical => &[
                "Do not proceed with this interaction",
                "Revoke any outstanding token approvals for this address",
                "Report the address to your security team",
            ],
            RiskLevel::High => &[
                "Avoid interacting unless the counterparty is independently verified",
                "Limit exposure to the smallest possible amount",
                "Monitor the address closely for further changes",
            ],
            RiskLevel::Medium => &[
                "Proceed with caution and verify contract details",
                "Consider using a smaller test amount first",
            ],
            RiskLevel::Low => &["Low risk detected; review the listed factors before proceeding"],
            RiskLevel::VeryLow => &["Standard security practices apply"],
        };
        lines.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLevel::VeryLow => "very_low",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

/// Result of one scoring run.
///
/// `risk_score`, `safety_grade` and `risk_level` are always derived together
/// from the same score, see [`SafetyGrade::from_score`] and
/// [`RiskLevel::from_score`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub id: Uuid,
    pub target: String,
    pub chain_id: u64,
    pub risk_factors: Vec<RiskFactor>,
    pub model_predictions: BTreeMap<String, f64>,
    pub risk_score: u8,
    pub safety_grade: SafetyGrade,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub assessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RiskAssessment {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn has_factor(&self, factor_type: &str) -> bool {
        self.risk_factors.iter().any(|f| f.factor_type == factor_type)
    }

    /// Compact view stored on alerts.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "assessment_id": self.id,
            "risk_score": self.risk_score,
            "safety_grade": self.safety_grade,
            "risk_level": self.risk_level,
            "confidence": self.confidence,
            "factor_types": self.risk_factors.iter().map(|f| f.factor_type.as_str()).collect::<Vec<_>>(),
            "warnings": self.warnings,
            "assessed_at": self.assessed_at,
        })
    }
}
