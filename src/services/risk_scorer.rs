use chrono::{DateTime, Utc};
use metrics::counter;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ScoringSettings;
use crate::error::AppError;
use crate::models::{
    ContractRiskRequest, ModelRegistry, RiskAssessment, RiskFactor, RiskLevel, RiskModel, SafetyGrade,
    TransactionRiskRequest, CONTRACT_RISK_MODEL, HIGH_RISK_THRESHOLD, LIKELY_THRESHOLD, MEDIUM_RISK_THRESHOLD,
    POSSIBLE_THRESHOLD, RUG_PULL_MODEL, TRANSACTION_RISK_MODEL,
};
use crate::services::assessment_cache::{AssessmentCache, CacheStats};
use crate::services::feature_provider::{FeatureProvider, FeatureVector};
use crate::services::model_predictor::{ModelPredictor, WeightedModelPredictor};
use crate::services::vulnerability_scanner::{FindingSeverity, VulnerabilityScanner};
use crate::utils::math::{clamp_unit, confidence_from_weight, weighted_risk_score};
use crate::utils::time::expiry_after;

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
pub const DEAD_ADDRESS: &str = "0x000000000000000000000000000000000000dead";

const DEFAULT_POSSIBLE_CUTOFF: f64 = 0.5;
const DEFAULT_LIKELY_CUTOFF: f64 = 0.8;

/// Everything a scoring run has collected before aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Findings {
    pub factors: Vec<RiskFactor>,
    pub warnings: Vec<String>,
    pub predictions: BTreeMap<String, f64>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_factor(mut self, factor: RiskFactor) -> Self {
        self.factors.push(factor);
        self
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Collapse findings into a finished assessment.
///
/// No factors, or factors whose weights sum to zero, give score 0 with full
/// confidence. Grade, level and recommendations always follow the score.
pub fn aggregate_assessment(
    target: &str,
    chain_id: u64,
    findings: Findings,
    confidence_divisor: f64,
    assessed_at: DateTime<Utc>,
    ttl: Duration,
) -> RiskAssessment {
    let (risk_score, confidence) = match weighted_risk_score(&findings.factors) {
        Some((score, total_weight)) => (score, confidence_from_weight(total_weight, confidence_divisor)),
        None => (0, 1.0),
    };
    let risk_level = RiskLevel::from_score(risk_score);

    RiskAssessment {
        id: Uuid::new_v4(),
        target: target.to_string(),
        chain_id,
        risk_factors: findings.factors,
        model_predictions: findings.predictions,
        risk_score,
        safety_grade: SafetyGrade::from_score(risk_score),
        risk_level,
        confidence,
        warnings: findings.warnings,
        recommendations: risk_level.recommendations(),
        assessed_at,
        expires_at: expiry_after(assessed_at, ttl),
    }
}

/// Scores transactions and contracts from heuristics and model predictions,
/// memoising results by request fingerprint.
pub struct RiskScorer {
    settings: ScoringSettings,
    models: ModelRegistry,
    features: Arc<dyn FeatureProvider>,
    predictor: Arc<dyn ModelPredictor>,
    scanner: Option<Arc<dyn VulnerabilityScanner>>,
    cache: AssessmentCache,
}

impl RiskScorer {
    pub fn new(settings: ScoringSettings, models: ModelRegistry, features: Arc<dyn FeatureProvider>) -> Self {
        let cache = AssessmentCache::new(settings.cache_ttl(), settings.cache_max_capacity);
        Self {
            settings,
            models,
            features,
            predictor: Arc::new(WeightedModelPredictor::default()),
            scanner: None,
            cache,
        }
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn ModelPredictor>) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_scanner(mut self, scanner: Arc<dyn VulnerabilityScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn cache(&self) -> &AssessmentCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn assess_transaction_risk(&self, request: &TransactionRiskRequest) -> Result<RiskAssessment, AppError> {
        request.validate()?;

        let fingerprint = request.fingerprint();
        if let Some(cached) = self.cache.get(&fingerprint).await {
            debug!(from = %request.from_address, chain_id = request.chain_id, "Transaction assessment served from cache");
            return Ok(cached);
        }

        let mut findings = Findings::new();
        self.transaction_heuristics(request, &mut findings);

        match self.features.transaction_features(request).await {
            Ok(features) => {
                let factor = self
                    .model_factor(
                        TRANSACTION_RISK_MODEL,
                        &features,
                        self.settings.transaction_model_damping,
                        self.settings.transaction_model_weight,
                        &mut findings,
                    )
                    .await;
                findings.factors.extend(factor);
            }
            Err(e) => warn!(from = %request.from_address, error = %e, "Transaction features unavailable, skipping model"),
        }

        let assessment = aggregate_assessment(
            &request.from_address,
            request.chain_id,
            findings,
            self.settings.confidence_weight_divisor,
            Utc::now(),
            self.cache.ttl(),
        );
        self.cache.insert(fingerprint, assessment.clone()).await;
        counter!("risk_assessments_total", 1, "kind" => "transaction");

        info!(
            from = %request.from_address,
            chain_id = request.chain_id,
            risk_score = assessment.risk_score,
            factors = assessment.risk_factors.len(),
            "Transaction risk assessed"
        );
        Ok(assessment)
    }

    pub async fn assess_contract_risk(&self, request: &ContractRiskRequest) -> Result<RiskAssessment, AppError> {
        request.validate()?;

        let fingerprint = request.fingerprint();
        if let Some(cached) = self.cache.get(&fingerprint).await {
            debug!(contract = %request.contract_address, chain_id = request.chain_id, "Contract assessment served from cache");
            return Ok(cached);
        }

        let mut findings = Findings::new();
        match self.features.contract_features(&request.contract_address, request.chain_id).await {
            Ok(features) => {
                self.contract_heuristics(request, &features, &mut findings);

                if request.use_ml_models {
                    let factor = self
                        .model_factor(
                            CONTRACT_RISK_MODEL,
                            &features,
                            self.settings.contract_model_damping,
                            self.settings.contract_model_weight,
                            &mut findings,
                        )
                        .await;
                    findings.factors.extend(factor);
                }

                if request.check_rug_pull {
                    self.rug_pull_analysis(&features, &mut findings).await;
                }
            }
            Err(e) => warn!(
                contract = %request.contract_address,
                chain_id = request.chain_id,
                error = %e,
                "Contract features unavailable, skipping feature-based analysis"
            ),
        }

        if request.check_vulnerabilities {
            self.vulnerability_analysis(request, &mut findings).await;
        }

        let assessment = aggregate_assessment(
            &request.contract_address,
            request.chain_id,
            findings,
            self.settings.confidence_weight_divisor,
            Utc::now(),
            self.cache.ttl(),
        );
        self.cache.insert(fingerprint, assessment.clone()).await;
        counter!("risk_assessments_total", 1, "kind" => "contract");

        info!(
            contract = %request.contract_address,
            chain_id = request.chain_id,
            risk_score = assessment.risk_score,
            grade = %assessment.safety_grade,
            factors = assessment.risk_factors.len(),
            "Contract risk assessed"
        );
        Ok(assessment)
    }

    fn transaction_heuristics(&self, request: &TransactionRiskRequest, findings: &mut Findings) {
        let from = request.from_address.trim().to_lowercase();

        match request.to_address.as_deref().map(|to| to.trim().to_lowercase()) {
            None => findings.factors.push(RiskFactor::new(
                "contract_creation",
                "Transaction deploys a new contract",
                0.3,
                0.4,
            )),
            Some(to) if to == ZERO_ADDRESS || to == DEAD_ADDRESS => {
                findings.factors.push(
                    RiskFactor::new("burn_address", "Recipient is a burn address", 0.9, 0.8).with_evidence(to),
                );
                findings.warn("Funds sent to a burn address cannot be recovered");
            }
            Some(to) if to == from => findings.factors.push(RiskFactor::new(
                "self_transfer",
                "Sender and recipient are the same address",
                0.2,
                0.2,
            )),
            Some(_) => {}
        }

        let large = self.settings.large_transfer_threshold;
        if large > 0.0 && request.amount >= large {
            let impact = clamp_unit(request.amount / (large * 10.0)).max(0.5);
            findings.factors.push(
                RiskFactor::new("large_transfer", "Transfer amount is unusually large", impact, 0.5)
                    .with_evidence(format!("amount={}", request.amount)),
            );
        }

        let high_gas = self.settings.high_gas_price_gwei;
        if let Some(gas_price) = request.gas_price_gwei {
            if high_gas > 0.0 && gas_price >= high_gas {
                let impact = clamp_unit(gas_price / (high_gas * 2.0)).max(0.5);
                findings.factors.push(
                    RiskFactor::new("high_gas_price", "Gas price far above normal levels", impact, 0.3)
                        .with_evidence(format!("gas_price_gwei={}", gas_price)),
                );
            }
        }
    }

    fn contract_heuristics(&self, request: &ContractRiskRequest, features: &FeatureVector, findings: &mut Findings) {
        let feature = |name: &str| features.get(name).copied().filter(|v| v.is_finite()).map(clamp_unit);

        if let Some(liquidity_risk) = feature("liquidity_risk").filter(|v| *v > 0.7) {
            findings.factors.push(RiskFactor::new(
                "low_liquidity",
                "Liquidity is too thin to exit positions safely",
                liquidity_risk,
                0.6,
            ));
        }

        if let Some(concentration) = feature("holder_concentration").filter(|v| *v > 0.5) {
            findings.factors.push(
                RiskFactor::new("holder_concentration", "Token supply is held by few addresses", concentration, 0.7)
                    .with_evidence(format!("holder_concentration={:.2}", concentration)),
            );
        }

        if let Some(privileges) = feature("owner_privileges").filter(|v| *v > 0.5) {
            findings.factors.push(RiskFactor::new(
                "owner_privileges",
                "Owner can pause, mint or change fees",
                privileges,
                0.5,
            ));
        }

        if feature("unverified_source").is_some_and(|v| v >= 0.5) {
            findings
                .factors
                .push(RiskFactor::new("unverified_source", "Contract source is not verified", 0.6, 0.5));
            findings.warn("Contract source code is not verified");
        }

        if request.check_honeypot {
            if let Some(restriction) = feature("sell_restriction").filter(|v| *v > 0.5) {
                findings.factors.push(RiskFactor::new(
                    "honeypot_risk",
                    "Selling the token appears to be restricted",
                    restriction,
                    0.9,
                ));
                findings.warn("Token transfers appear restricted; possible honeypot");
            }
        }
    }

    async fn predict(&self, model_id: &str, features: &FeatureVector, findings: &mut Findings) -> Option<(f64, &RiskModel)> {
        let Some(model) = self.models.get(model_id) else {
            warn!(model = %model_id, "Risk model not registered, skipping");
            return None;
        };

        match self.predictor.predict(model, features).await {
            Ok(prediction) => {
                let prediction = clamp_unit(prediction);
                findings.predictions.insert(model.id.clone(), prediction);
                Some((prediction, model))
            }
            Err(e) => {
                warn!(model = %model_id, error = %e, "Model prediction failed, skipping");
                None
            }
        }
    }

    /// A model contributes only when its prediction clears `high_risk`.
    async fn model_factor(
        &self,
        model_id: &str,
        features: &FeatureVector,
        damping: f64,
        weight: f64,
        findings: &mut Findings,
    ) -> Option<RiskFactor> {
        let (prediction, model) = self.predict(model_id, features, findings).await?;
        let cutoff = model.threshold(HIGH_RISK_THRESHOLD)?;
        if prediction <= cutoff {
            if model.threshold(MEDIUM_RISK_THRESHOLD).is_some_and(|medium| prediction > medium) {
                findings.warn(format!("Model {} indicates moderate risk ({:.2})", model.id, prediction));
            }
            return None;
        }

        Some(
            RiskFactor::new(
                &format!("ml_{}", model.id),
                format!("Model {} flags elevated risk", model.id),
                prediction * damping,
                weight,
            )
            .with_evidence(format!("prediction={:.3} threshold={:.2} version={}", prediction, cutoff, model.version)),
        )
    }

    async fn rug_pull_analysis(&self, features: &FeatureVector, findings: &mut Findings) {
        let Some((prediction, model)) = self.predict(RUG_PULL_MODEL, features, findings).await else {
            return;
        };
        let possible = model.threshold(POSSIBLE_THRESHOLD).unwrap_or(DEFAULT_POSSIBLE_CUTOFF);
        let likely = model.threshold(LIKELY_THRESHOLD).unwrap_or(DEFAULT_LIKELY_CUTOFF);

        if prediction > possible {
            findings.factors.push(
                RiskFactor::new(
                    "rug_pull_risk",
                    "Liquidity and ownership patterns resemble a rug pull",
                    prediction,
                    self.settings.rug_pull_factor_weight,
                )
                .with_evidence(format!("prediction={:.3}", prediction)),
            );
            findings.warn(format!("Elevated rug-pull risk detected (probability {:.2})", prediction));
        }
        if prediction > likely {
            findings.warn("Rug pull is likely: liquidity could be withdrawn at any time");
        }
    }

    async fn vulnerability_analysis(&self, request: &ContractRiskRequest, findings: &mut Findings) {
        let Some(scanner) = &self.scanner else {
            debug!(contract = %request.contract_address, "No vulnerability scanner configured");
            return;
        };

        match scanner.scan(&request.contract_address, request.chain_id).await {
            Ok(results) => {
                for finding in results.into_iter().filter(|f| f.severity != FindingSeverity::Informational) {
                    if finding.severity <= FindingSeverity::High {
                        findings.warn(format!("Vulnerability found: {}", finding.title));
                    }
                    findings.factors.push(
                        RiskFactor::new("vulnerability", finding.title, finding.severity.impact(), 0.8)
                            .with_evidence(finding.id),
                    );
                }
            }
            Err(e) => warn!(contract = %request.contract_address, error = %e, "Vulnerability scan failed, skipping"),
        }
    }
}
