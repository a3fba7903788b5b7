//! Risk detection error types
//!
//! A single error enum for the classification pipeline. Analyzer failures are
//! recovered inside the classifier; only configuration and input errors ever
//! reach a caller of `classify_and_record`.

use thiserror::Error;

/// Risk detection error type
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Malformed configuration (signature table, capacities, timeouts)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transaction summary rejected before classification
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Secondary analyzer did not answer within its time budget
    #[error("Analysis timed out after {timeout_ms}ms")]
    AnalysisTimeout { timeout_ms: u64 },

    /// Secondary analyzer unreachable or answered with an error status
    #[error("Analysis transport error: {0}")]
    AnalysisTransport(String),

    /// Secondary analyzer answered with a body we could not read
    #[error("Malformed analysis response: {0}")]
    MalformedResponse(String),

    /// Report persistence failed
    #[error("Report error: {0}")]
    Report(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Risk detection result type
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Errors the pipeline recovers from locally (fallback path or log-and-continue)
    pub fn is_recoverable(&self) -> bool {
        self.is_analysis_failure() || matches!(self, Self::Report(_))
    }

    /// Errors raised by the secondary analyzer call
    pub fn is_analysis_failure(&self) -> bool {
        matches!(
            self,
            Self::AnalysisTimeout { .. } | Self::AnalysisTransport(_) | Self::MalformedResponse(_)
        )
    }

    /// Short machine-readable kind, used in logs and API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::MalformedInput(_) => "malformed_input",
            Self::AnalysisTimeout { .. } => "analysis_timeout",
            Self::AnalysisTransport(_) => "analysis_transport",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Report(_) => "report",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for MonitorError {
    fn from(e: toml::de::Error) -> Self {
        Self::Configuration(e.to_string())
    }
}
