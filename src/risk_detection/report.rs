//! Per-transaction analysis reports

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::risk_detection::{
    errors::{MonitorError, Result},
    rules::RiskTier,
    ClassificationResult, ClassificationSource,
};

/// Report sink, invoked fire-and-forget by the pipeline
#[async_trait]
pub trait ReportWriter: Send + Sync {
    async fn persist(&self, hash: &str, result: &ClassificationResult) -> Result<PathBuf>;
}

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    tx_hash: &'a str,
    timestamp: String,
    tier: RiskTier,
    source: ClassificationSource,
    analysis: &'a str,
}

/// Writes `{dir}/{hash}_analysis.json`
#[derive(Debug, Clone)]
pub struct JsonReportWriter {
    directory: PathBuf,
}

impl JsonReportWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Report path for a hash; hashes are used verbatim in file names
    pub fn report_path(&self, hash: &str) -> Result<PathBuf> {
        let valid = !hash.is_empty()
            && hash
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(MonitorError::Report(format!(
                "refusing to use '{}' as a report file name",
                hash
            )));
        }
        Ok(self.directory.join(format!("{}_analysis.json", hash)))
    }
}

#[async_trait]
impl ReportWriter for JsonReportWriter {
    async fn persist(&self, hash: &str, result: &ClassificationResult) -> Result<PathBuf> {
        let path = self.report_path(hash)?;

        let document = ReportDocument {
            tx_hash: hash,
            timestamp: Utc::now().to_rfc3339(),
            tier: result.tier,
            source: result.source,
            analysis: &result.message,
        };
        let content = serde_json::to_vec_pretty(&document)?;

        tokio::fs::create_dir_all(&self.directory).await?;
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }
}
