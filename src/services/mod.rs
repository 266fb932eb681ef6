pub mod alert_service;
pub mod assessment_cache;
pub mod blockchain_service;
pub mod feature_provider;
pub mod model_predictor;
pub mod monitor_store;
pub mod monitoring_service;
pub mod risk_scorer;
pub mod rule_engine;
pub mod vulnerability_scanner;

pub use alert_service::{AlertChannel, AlertDispatcher, EmailChannel, LogChannel, WebhookChannel};
pub use assessment_cache::{AssessmentCache, CacheStats};
pub use blockchain_service::{BlockchainService, ChainReader};
pub use feature_provider::{FeatureProvider, FeatureVector, NeutralFeatureProvider, StaticFeatureProvider};
pub use model_predictor::{ModelPredictor, WeightedModelPredictor};
pub use monitor_store::MonitorStore;
pub use monitoring_service::{MonitoringService, MonitoringStats, SweepSummary};
pub use risk_scorer::{aggregate_assessment, Findings, RiskScorer};
pub use rule_engine::RuleEngine;
pub use vulnerability_scanner::{FindingSeverity, VulnerabilityFinding, VulnerabilityScanner};
