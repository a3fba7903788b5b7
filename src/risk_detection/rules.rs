//! Signature rule engine
//!
//! Deterministic pattern matching over a transaction's decoded function name
//! and raw calldata. Signatures are evaluated in declaration order and the
//! first hit wins.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::risk_detection::errors::{MonitorError, Result};
use crate::risk_detection::transaction::TransactionSummary;

/// Risk tier assigned to a classified transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    /// Never produced by a signature; reserved for analyzers that report it explicitly
    Critical,
}

impl RiskTier {
    pub const ALL: [RiskTier; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// High or above: the fast path alone is enough to act on
    pub fn is_actionable(&self) -> bool {
        *self >= Self::High
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Label of the distribution bucket shown on the dashboard
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Medium => "Medium Risk",
            Self::High => "High Risk",
            Self::Critical => "Critical Risk",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "#10B981",
            Self::Medium => "#FBBF24",
            Self::High => "#EF4444",
            Self::Critical => "#991B1B",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTier {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(MonitorError::MalformedInput(format!(
                "unknown risk tier '{}'",
                other
            ))),
        }
    }
}

/// A known risk signature: literal substring or 4-byte function selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub pattern: String,
    pub tier: RiskTier,
    pub message: String,
}

impl Signature {
    pub fn new(pattern: impl Into<String>, tier: RiskTier, message: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            tier,
            message: message.into(),
        }
    }

    /// Built-in signature table, in priority order
    pub fn default_table() -> Vec<Signature> {
        vec![
            Signature::new(
                "withdraw()",
                RiskTier::High,
                "CRITICAL: Withdraw function called - check for reentrancy protection",
            ),
            Signature::new(
                "transfer(",
                RiskTier::Medium,
                "WARNING: Transfer function called - verify recipient",
            ),
            Signature::new(
                "0x3ccfd60b",
                RiskTier::High,
                "CRITICAL: Withdraw function signature detected",
            ),
            Signature::new(
                "0xa9059cbb",
                RiskTier::Medium,
                "WARNING: ERC20 transfer detected",
            ),
            Signature::new(
                "0x00000000",
                RiskTier::High,
                "CRITICAL: Zero address reference detected",
            ),
        ]
    }

    fn validate(&self, position: usize) -> Result<()> {
        if self.pattern.trim().is_empty() {
            return Err(MonitorError::Configuration(format!(
                "signature #{} has an empty pattern",
                position
            )));
        }
        if self.tier == RiskTier::Critical {
            return Err(MonitorError::Configuration(format!(
                "signature '{}' uses tier critical; signatures are limited to low/medium/high",
                self.pattern
            )));
        }
        if self.message.trim().is_empty() {
            return Err(MonitorError::Configuration(format!(
                "signature '{}' has an empty message",
                self.pattern
            )));
        }
        Ok(())
    }
}

/// Outcome of the fast path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternVerdict {
    pub tier: RiskTier,
    pub message: String,
    /// Pattern that fired, `None` for the no-risk sentinel
    pub matched_pattern: Option<String>,
}

impl PatternVerdict {
    pub const NO_RISK_MESSAGE: &'static str = "No immediate risks detected via pattern matching";

    pub fn no_risk() -> Self {
        Self {
            tier: RiskTier::Low,
            message: Self::NO_RISK_MESSAGE.to_string(),
            matched_pattern: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched_pattern.is_some()
    }
}

/// Ordered signature matcher
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    signatures: Vec<Signature>,
    /// Lowercased patterns, index-aligned with `signatures`
    normalized: Vec<String>,
}

impl PatternMatcher {
    /// Build a matcher, rejecting malformed signatures
    pub fn new(signatures: Vec<Signature>) -> Result<Self> {
        for (i, signature) in signatures.iter().enumerate() {
            signature.validate(i)?;
        }
        let normalized = signatures
            .iter()
            .map(|s| s.pattern.to_lowercase())
            .collect();
        Ok(Self {
            signatures,
            normalized,
        })
    }

    /// Matcher over the built-in table
    pub fn with_default_signatures() -> Self {
        let signatures = Signature::default_table();
        let normalized = signatures
            .iter()
            .map(|s| s.pattern.to_lowercase())
            .collect();
        Self {
            signatures,
            normalized,
        }
    }

    /// First signature (in declaration order) found in either field
    pub fn match_signature(&self, summary: &TransactionSummary) -> Option<&Signature> {
        let function = summary
            .decoded_function
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        let input = summary
            .input_data
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();

        self.normalized
            .iter()
            .position(|pattern| input.contains(pattern.as_str()) || function.contains(pattern.as_str()))
            .map(|idx| &self.signatures[idx])
    }

    /// Fast-path verdict; falls back to the Low no-risk sentinel
    pub fn evaluate(&self, summary: &TransactionSummary) -> PatternVerdict {
        match self.match_signature(summary) {
            Some(signature) => PatternVerdict {
                tier: signature.tier,
                message: signature.message.clone(),
                matched_pattern: Some(signature.pattern.clone()),
            },
            None => PatternVerdict::no_risk(),
        }
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::with_default_signatures()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn summary(function: Option<&str>, input: Option<&str>) -> TransactionSummary {
        TransactionSummary {
            hash: "0xtest".to_string(),
            decoded_function: function.map(str::to_string),
            input_data: input.map(str::to_string),
            ..TransactionSummary::default()
        }
    }

    #[test_case(Some("withdraw()"), Some("0x3ccfd60b"), RiskTier::High ; "withdraw by name")]
    #[test_case(Some("WITHDRAW()"), None, RiskTier::High ; "case insensitive name")]
    #[test_case(None, Some("0x3CCFD60B000000"), RiskTier::High ; "withdraw selector only")]
    #[test_case(Some("transfer(address,uint256)"), None, RiskTier::Medium ; "transfer by name")]
    #[test_case(None, Some("0xa9059cbb0000"), RiskTier::Medium ; "erc20 selector")]
    #[test_case(Some("approve(address,uint256)"), Some("0xdeadbeef"), RiskTier::Low ; "no match")]
    fn test_default_table(function: Option<&str>, input: Option<&str>, expected: RiskTier) {
        let matcher = PatternMatcher::default();
        assert_eq!(matcher.evaluate(&summary(function, input)).tier, expected);
    }

    #[test]
    fn test_declaration_order_wins() {
        // "transfer(" is declared before the zero-address selector
        let matcher = PatternMatcher::default();
        let verdict = matcher.evaluate(&summary(Some("transfer(address,uint256)"), Some("0x00000000")));
        assert_eq!(verdict.tier, RiskTier::Medium);
        assert_eq!(verdict.matched_pattern.as_deref(), Some("transfer("));
    }

    #[test]
    fn test_missing_fields_match_nothing() {
        let matcher = PatternMatcher::default();
        let verdict = matcher.evaluate(&summary(None, None));
        assert_eq!(verdict, PatternVerdict::no_risk());

        let verdict = matcher.evaluate(&summary(Some(""), Some("")));
        assert!(!verdict.is_match());
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let err = PatternMatcher::new(vec![Signature::new("  ", RiskTier::High, "x")]).unwrap_err();
        assert!(matches!(err, MonitorError::Configuration(_)));
    }

    #[test]
    fn test_critical_signature_rejected() {
        let result = PatternMatcher::new(vec![Signature::new("selfdestruct", RiskTier::Critical, "x")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_mixed_case_pattern_is_normalized() {
        let matcher = PatternMatcher::new(vec![Signature::new("SelfDestruct", RiskTier::High, "boom")]).unwrap();
        let verdict = matcher.evaluate(&summary(Some("selfdestruct(address)"), None));
        assert_eq!(verdict.tier, RiskTier::High);
        assert_eq!(verdict.message, "boom");
    }

    #[test]
    fn test_tier_parsing_and_order() {
        assert_eq!("HIGH".parse::<RiskTier>().unwrap(), RiskTier::High);
        assert!("High Risk".parse::<RiskTier>().is_err());
        assert!(RiskTier::Critical > RiskTier::High);
        assert!(RiskTier::High.is_actionable());
        assert!(!RiskTier::Medium.is_actionable());
    }
}
