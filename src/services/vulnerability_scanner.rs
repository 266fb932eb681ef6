use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    Critical,
    High,
    Medium,
    Low,
    Informational,
}

impl FindingSeverity {
    pub fn impact(&self) -> f64 {
        match self {
            FindingSeverity::Critical => 1.0,
            FindingSeverity::High => 0.8,
            FindingSeverity::Medium => 0.5,
            FindingSeverity::Low => 0.2,
            FindingSeverity::Informational => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityFinding {
    pub id: String,
    pub title: String,
    pub severity: FindingSeverity,
}

/// Opaque contract scanner consulted when a request asks for a
/// vulnerability check.
#[async_trait]
pub trait VulnerabilityScanner: Send + Sync {
    async fn scan(&self, address: &str, chain_id: u64) -> Result<Vec<VulnerabilityFinding>, ScoringError>;
}
