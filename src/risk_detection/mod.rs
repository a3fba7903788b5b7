//! Transaction risk classification
//!
//! Two-tier pipeline: deterministic signature matching, escalating to a
//! generative-model analysis only when the signatures are not decisive.
//!
//! - `rules`: ordered signature table and the `PatternMatcher`
//! - `analyzer`: the secondary analyzer seam and its Ollama client
//! - `detector`: the `HybridClassifier` escalation policy
//! - `storage`: bounded, most-recent-first `TransactionStore`
//! - `stats`: `StatsAggregator` counters and risk distribution
//! - `report`: per-transaction JSON reports

pub mod analyzer;
pub mod config;
pub mod detector;
pub mod errors;
pub mod report;
pub mod rules;
pub mod stats;
pub mod storage;
pub mod transaction;

pub use analyzer::{AnalysisRequest, AnalyzerVerdict, DisabledAnalyzer, OllamaAnalyzer, SecondaryAnalyzer};
pub use config::MonitorConfig;
pub use detector::HybridClassifier;
pub use errors::{MonitorError, Result};
pub use report::{JsonReportWriter, ReportWriter};
pub use rules::{PatternMatcher, PatternVerdict, RiskTier, Signature};
pub use stats::{StatsAggregator, StatsSnapshot};
pub use storage::TransactionStore;
pub use transaction::TransactionSummary;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which path produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationSource {
    /// Actionable signature hit, analyzer skipped
    PatternMatch,
    /// Generative-model analysis succeeded
    SecondaryAnalysis,
    /// Analyzer failed, timed out or returned nothing; pattern result kept
    PatternFallback,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatternMatch => "pattern_match",
            Self::SecondaryAnalysis => "secondary_analysis",
            Self::PatternFallback => "pattern_fallback",
        }
    }
}

/// Classification outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub tier: RiskTier,
    /// Human-readable finding
    pub message: String,
    pub source: ClassificationSource,
    pub timestamp: DateTime<Utc>,
    /// Pattern finding kept alongside a generative analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ClassificationResult {
    pub fn new(tier: RiskTier, message: impl Into<String>, source: ClassificationSource) -> Self {
        Self {
            tier,
            message: message.into(),
            source,
            timestamp: Utc::now(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A summary together with its classification; never mutated after storing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub transaction: TransactionSummary,
    pub classification: ClassificationResult,
}

impl StoredTransaction {
    pub fn new(transaction: TransactionSummary, classification: ClassificationResult) -> Self {
        Self {
            transaction,
            classification,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serialization() {
        let result = ClassificationResult::new(RiskTier::High, "withdraw", ClassificationSource::PatternMatch);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["tier"], "high");
        assert_eq!(json["source"], "PatternMatch");
        assert!(json.get("context").is_none());
    }

    #[test]
    fn test_result_with_context() {
        let result = ClassificationResult::new(RiskTier::Low, "AI Analysis:\nok", ClassificationSource::SecondaryAnalysis)
            .with_context("No immediate risks detected via pattern matching");
        assert!(result.context.is_some());
        assert_eq!(ClassificationSource::SecondaryAnalysis.as_str(), "secondary_analysis");
    }
}
