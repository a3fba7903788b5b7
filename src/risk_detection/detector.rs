//! Hybrid classifier - fast signatures first, generative analysis second
//!
//! `QuickCheck → ShortCircuitHigh` for actionable signature hits, otherwise
//! `AttemptSecondary → SecondarySuccess | Fallback`. The analyzer call is the
//! only suspension point and is bounded by `timeout`; on expiry the future is
//! dropped, which cancels the in-flight request.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::monitoring::PipelineMetrics;
use crate::risk_detection::{
    analyzer::{AnalysisRequest, AnalyzerVerdict, SecondaryAnalyzer},
    errors::{MonitorError, Result},
    rules::{PatternMatcher, PatternVerdict, RiskTier},
    transaction::TransactionSummary,
    ClassificationResult, ClassificationSource,
};

/// Default bound for the secondary analyzer call
pub const DEFAULT_ANALYZER_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HybridClassifier {
    matcher: PatternMatcher,
    analyzer: Arc<dyn SecondaryAnalyzer>,
    timeout: Duration,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl HybridClassifier {
    pub fn new(matcher: PatternMatcher, analyzer: Arc<dyn SecondaryAnalyzer>) -> Self {
        Self {
            matcher,
            analyzer,
            timeout: DEFAULT_ANALYZER_TIMEOUT,
            metrics: None,
        }
    }

    /// Override the analyzer bound; zero is rejected
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(MonitorError::Configuration(
                "analyzer timeout must be greater than zero".to_string(),
            ));
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Classify one transaction. Never fails: analyzer errors take the fallback path.
    pub async fn classify(&self, summary: &TransactionSummary) -> ClassificationResult {
        let quick = self.matcher.evaluate(summary);

        // Known-dangerous signatures never wait on the remote call
        if quick.tier.is_actionable() {
            info!(
                tx = summary.short_hash(),
                tier = %quick.tier,
                pattern = quick.matched_pattern.as_deref().unwrap_or_default(),
                "signature short-circuit"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_short_circuit();
            }
            return ClassificationResult::new(quick.tier, quick.message, ClassificationSource::PatternMatch);
        }

        match self.attempt_secondary(summary).await {
            Ok(verdict) if !verdict.is_empty() => Self::merge(quick, verdict),
            Ok(_) => {
                debug!(tx = summary.short_hash(), "analyzer returned empty response, falling back");
                self.fallback(quick)
            }
            Err(e) => {
                warn!(
                    tx = summary.short_hash(),
                    analyzer = self.analyzer.name(),
                    kind = e.kind(),
                    error = %e,
                    "secondary analysis failed, falling back to pattern result"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_analyzer_failure();
                }
                self.fallback(quick)
            }
        }
    }

    async fn attempt_secondary(&self, summary: &TransactionSummary) -> Result<AnalyzerVerdict> {
        let request = AnalysisRequest::from(summary);
        let started = Instant::now();

        let outcome = tokio::time::timeout(self.timeout, self.analyzer.analyze(&request)).await;

        if let Some(metrics) = &self.metrics {
            metrics.observe_analyzer_latency(started.elapsed());
        }

        match outcome {
            Ok(result) => result,
            Err(_) => Err(MonitorError::AnalysisTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    fn merge(quick: PatternVerdict, verdict: AnalyzerVerdict) -> ClassificationResult {
        // Free text carries no tier; only a structured one overrides the fast path
        let tier = verdict.tier.unwrap_or(quick.tier);
        ClassificationResult::new(
            tier,
            format!("AI Analysis:\n{}", verdict.text.trim()),
            ClassificationSource::SecondaryAnalysis,
        )
        .with_context(quick.message)
    }

    fn fallback(&self, quick: PatternVerdict) -> ClassificationResult {
        if let Some(metrics) = &self.metrics {
            metrics.record_fallback();
        }
        ClassificationResult::new(quick.tier, quick.message, ClassificationSource::PatternFallback)
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn analyzer_name(&self) -> &str {
        self.analyzer.name()
    }

    /// Tier the fast path alone would assign
    pub fn quick_tier(&self, summary: &TransactionSummary) -> RiskTier {
        self.matcher.evaluate(summary).tier
    }
}
