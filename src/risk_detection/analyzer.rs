//! Secondary (generative-model) analyzer
//!
//! The classifier treats the analyzer as an opaque remote call. Every failure
//! comes back as a `MonitorError` value; the caller decides the fallback.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::risk_detection::errors::{MonitorError, Result};
use crate::risk_detection::rules::RiskTier;
use crate::risk_detection::transaction::TransactionSummary;

/// Fields forwarded to the analyzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    pub hash: String,
    pub from_address: Option<String>,
    pub value: Decimal,
    pub decoded_function: Option<String>,
    pub input_data: Option<String>,
}

impl From<&TransactionSummary> for AnalysisRequest {
    fn from(summary: &TransactionSummary) -> Self {
        Self {
            hash: summary.hash.clone(),
            from_address: summary.from_address.clone(),
            value: summary.value,
            decoded_function: summary.decoded_function.clone(),
            input_data: summary.input_data.clone(),
        }
    }
}

impl AnalysisRequest {
    /// Prompt sent to the generative model
    pub fn prompt(&self) -> String {
        format!(
            "Analyze this blockchain transaction for security risks:\n\n\
             Transaction Hash: {}\n\
             From: {}\n\
             Value: {} ETH\n\
             Function: {}\n\
             Input Data: {}\n\n\
             Potential risks to check:\n\
             1. Reentrancy attempts\n\
             2. Unauthorized access\n\
             3. Unexpected value transfers\n\
             4. Suspicious input patterns\n\
             5. Known attack signatures\n\n\
             Provide:\n\
             - Risk level (High/Medium/Low)\n\
             - Specific concerns\n\
             - Recommended actions",
            self.hash,
            self.from_address.as_deref().unwrap_or("unknown"),
            self.value,
            self.decoded_function.as_deref().unwrap_or("unknown"),
            self.input_data.as_deref().unwrap_or(""),
        )
    }
}

/// Analyzer answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerVerdict {
    /// Free-text analysis
    pub text: String,
    /// Tier, only when the analyzer reports one in structured form
    pub tier: Option<RiskTier>,
}

impl AnalyzerVerdict {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tier: None,
        }
    }

    pub fn with_tier(mut self, tier: RiskTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Secondary analyzer interface
#[async_trait]
pub trait SecondaryAnalyzer: Send + Sync {
    /// Analyze a transaction; the classifier bounds this call with its own timeout
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzerVerdict>;

    /// Name used in logs and status output
    fn name(&self) -> &str;
}

/// Analyzer used when the generative model is switched off
#[derive(Debug, Default, Clone)]
pub struct DisabledAnalyzer;

#[async_trait]
impl SecondaryAnalyzer for DisabledAnalyzer {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalyzerVerdict> {
        Err(MonitorError::AnalysisTransport("analyzer disabled".to_string()))
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Ollama `/api/generate` client
pub struct OllamaAnalyzer {
    base_url: String,
    model: String,
    temperature: f64,
    client: reqwest::Client,
}

impl OllamaAnalyzer {
    pub const DEFAULT_MODEL: &'static str = "codellama:7b";

    /// # Arguments
    /// * `base_url` - server root, e.g. `http://localhost:11434`
    /// * `model` - model tag
    /// * `timeout` - transport-level timeout, a backstop for the classifier's own bound
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.2,
            client,
        })
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl SecondaryAnalyzer for OllamaAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzerVerdict> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: request.prompt(),
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        debug!(model = %self.model, url = %self.generate_url(), "requesting model analysis");

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| MonitorError::AnalysisTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::AnalysisTransport(format!(
                "model server returned HTTP {}",
                status
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| MonitorError::MalformedResponse(e.to_string()))?;

        let text = parsed.response.ok_or_else(|| {
            MonitorError::MalformedResponse("missing 'response' field".to_string())
        })?;

        Ok(AnalyzerVerdict::text(text))
    }

    fn name(&self) -> &str {
        &self.model
    }
}
