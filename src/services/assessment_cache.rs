use chrono::{DateTime, Utc};
use metrics::counter;
use moka::future::Cache;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::models::RiskAssessment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Fingerprint-keyed store of completed assessments.
///
/// Entries carry their own `expires_at`; a lookup past that instant drops
/// the entry and reports a miss.
pub struct AssessmentCache {
    entries: Cache<String, RiskAssessment>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AssessmentCache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_capacity).build(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, fingerprint: &str) -> Option<RiskAssessment> {
        self.get_at(fingerprint, Utc::now()).await
    }

    pub async fn get_at(&self, fingerprint: &str, now: DateTime<Utc>) -> Option<RiskAssessment> {
        match self.entries.get(fingerprint).await {
            Some(assessment) if !assessment.is_expired_at(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                counter!("risk_assessment_cache_hits_total", 1);
                Some(assessment)
            }
            Some(_) => {
                debug!(fingerprint = %fingerprint, "Dropping expired assessment");
                self.entries.invalidate(fingerprint).await;
                self.record_miss();
                None
            }
            None => {
                self.record_miss();
                None
            }
        }
    }

    pub async fn insert(&self, fingerprint: String, assessment: RiskAssessment) {
        self.entries.insert(fingerprint, assessment).await;
    }

    pub async fn invalidate(&self, fingerprint: &str) {
        self.entries.invalidate(fingerprint).await;
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Approximate; moka applies pending writes lazily.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entry_count(),
        }
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("risk_assessment_cache_misses_total", 1);
    }
}
