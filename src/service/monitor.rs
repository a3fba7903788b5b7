//! Risk monitor service
//!
//! Owns the classifier and every piece of shared state. Handlers and the
//! dashboard receive it as an `Arc<RiskMonitor>`; nothing here is global.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::monitoring::PipelineMetrics;
use crate::risk_detection::{
    ClassificationResult, ClassificationSource, HybridClassifier, JsonReportWriter, MonitorConfig,
    MonitorError, ReportWriter, Result, RiskTier, Signature, StatsAggregator, StatsSnapshot,
    StoredTransaction, TransactionStore, TransactionSummary,
};

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Pushed to event-stream subscribers after each classification
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub hash: String,
    pub tier: RiskTier,
    pub source: ClassificationSource,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ClassificationEvent {
    fn from_stored(stored: &StoredTransaction) -> Self {
        let event_type = if stored.classification.tier.is_actionable() {
            "high_risk_detected"
        } else {
            "transaction_classified"
        };
        Self {
            event_type: event_type.to_string(),
            hash: stored.transaction.hash.clone(),
            tier: stored.classification.tier,
            source: stored.classification.source,
            message: stored.classification.message.clone(),
            timestamp: stored.classification.timestamp,
        }
    }
}

pub struct RiskMonitor {
    classifier: HybridClassifier,
    /// Store behind the HTTP API
    store: Arc<TransactionStore>,
    /// Smaller store behind the dashboard
    dashboard_store: Arc<TransactionStore>,
    stats: Arc<StatsAggregator>,
    reports: Option<Arc<dyn ReportWriter>>,
    metrics: Arc<PipelineMetrics>,
    events: broadcast::Sender<ClassificationEvent>,
}

impl RiskMonitor {
    pub fn new(
        classifier: HybridClassifier,
        store: TransactionStore,
        dashboard_store: TransactionStore,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            classifier,
            store: Arc::new(store),
            dashboard_store: Arc::new(dashboard_store),
            stats: Arc::new(StatsAggregator::new()),
            reports: None,
            metrics,
            events,
        }
    }

    /// Wire the whole pipeline from a validated configuration
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(
            PipelineMetrics::new()
                .map_err(|e| MonitorError::Configuration(format!("metrics registry: {}", e)))?,
        );

        let classifier = HybridClassifier::new(config.build_matcher()?, config.build_analyzer()?)
            .with_timeout(config.analyzer_timeout())?
            .with_metrics(metrics.clone());

        let mut monitor = Self::new(
            classifier,
            TransactionStore::new(config.store.api_capacity)?,
            TransactionStore::new(config.store.dashboard_capacity)?,
            metrics,
        );

        if config.reports.enabled {
            monitor = monitor.with_report_writer(Arc::new(JsonReportWriter::new(
                config.reports.directory.clone(),
            )));
        }

        info!(
            signatures = config.signatures.len(),
            analyzer = monitor.classifier.analyzer_name(),
            timeout_secs = config.analyzer.timeout_secs,
            api_capacity = config.store.api_capacity,
            dashboard_capacity = config.store.dashboard_capacity,
            "Risk monitor initialized"
        );
        Ok(monitor)
    }

    pub fn with_report_writer(mut self, writer: Arc<dyn ReportWriter>) -> Self {
        self.reports = Some(writer);
        self
    }

    /// Sole entry point for the ingestion feed and route handlers.
    ///
    /// Malformed summaries are rejected; everything else yields a result, with
    /// analyzer failures absorbed by the classifier's fallback path.
    pub async fn classify_and_record(&self, summary: TransactionSummary) -> Result<ClassificationResult> {
        if let Err(e) = summary.validate() {
            self.metrics.record_rejected_input();
            warn!(error = %e, "rejecting transaction summary");
            return Err(e);
        }

        let result = self.classifier.classify(&summary).await;
        let stored = StoredTransaction::new(summary, result.clone());

        self.store.add(stored.clone());
        self.dashboard_store.add(stored.clone());
        self.stats.update(&stored);
        self.metrics.record_classification(result.tier, result.source);

        // No subscribers is not an error
        let _ = self.events.send(ClassificationEvent::from_stored(&stored));

        if let Some(writer) = &self.reports {
            self.spawn_report(writer.clone(), stored.transaction.hash.clone(), result.clone());
        }

        debug!(
            tx = stored.transaction.short_hash(),
            tier = %result.tier,
            source = result.source.as_str(),
            "transaction recorded"
        );
        Ok(result)
    }

    /// `classify_and_record` followed by an awaited report write, for callers
    /// that may exit before a spawned write would finish. A failed write is
    /// logged and does not fail the classification.
    pub async fn classify_and_persist(
        &self,
        summary: TransactionSummary,
        writer: &dyn ReportWriter,
    ) -> Result<ClassificationResult> {
        let hash = summary.hash.clone();
        let result = self.classify_and_record(summary).await?;
        match writer.persist(&hash, &result).await {
            Ok(path) => info!(path = %path.display(), "report saved"),
            Err(e) => warn!(error = %e, "failed to persist transaction report"),
        }
        Ok(result)
    }

    fn spawn_report(&self, writer: Arc<dyn ReportWriter>, hash: String, result: ClassificationResult) {
        tokio::spawn(async move {
            match writer.persist(&hash, &result).await {
                Ok(path) => debug!(path = %path.display(), "report saved"),
                Err(e) => warn!(error = %e, "failed to persist transaction report"),
            }
        });
    }

    pub fn list_transactions(&self, filter: Option<RiskTier>) -> Vec<StoredTransaction> {
        self.store.list(filter)
    }

    pub fn get_transaction(&self, hash: &str) -> Option<StoredTransaction> {
        self.store.get(hash)
    }

    pub fn dashboard_transactions(&self) -> Vec<StoredTransaction> {
        self.dashboard_store.snapshot()
    }

    pub fn read_stats(&self) -> StatsSnapshot {
        self.stats.read()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClassificationEvent> {
        self.events.subscribe()
    }

    pub fn signatures(&self) -> &[Signature] {
        self.classifier.matcher().signatures()
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn classifier(&self) -> &HybridClassifier {
        &self.classifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk_detection::{DisabledAnalyzer, PatternMatcher};

    fn monitor(api: usize, dashboard: usize) -> RiskMonitor {
        let metrics = Arc::new(PipelineMetrics::new().unwrap());
        let classifier = HybridClassifier::new(PatternMatcher::default(), Arc::new(DisabledAnalyzer))
            .with_metrics(metrics.clone());
        RiskMonitor::new(
            classifier,
            TransactionStore::new(api).unwrap(),
            TransactionStore::new(dashboard).unwrap(),
            metrics,
        )
    }

    #[tokio::test]
    async fn test_records_into_both_stores_and_stats() {
        let monitor = monitor(10, 2);
        for i in 0..3 {
            let summary = TransactionSummary::new(format!("0x{}", i)).with_function("withdraw()");
            monitor.classify_and_record(summary).await.unwrap();
        }

        assert_eq!(monitor.list_transactions(None).len(), 3);
        assert_eq!(monitor.dashboard_transactions().len(), 2);
        let stats = monitor.read_stats();
        assert_eq!(stats.protected_transactions, 3);
        assert_eq!(stats.high_risk_detected, 3);
    }

    #[tokio::test]
    async fn test_malformed_input_is_not_recorded() {
        let monitor = monitor(10, 2);
        let err = monitor
            .classify_and_record(TransactionSummary::default().with_function("withdraw()"))
            .await
            .unwrap_err();

        assert!(matches!(err, MonitorError::MalformedInput(_)));
        assert!(monitor.list_transactions(None).is_empty());
        assert_eq!(monitor.read_stats().protected_transactions, 0);
        assert_eq!(monitor.metrics().rejected_inputs.get(), 1.0);
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let monitor = monitor(10, 2);
        let mut rx = monitor.subscribe();

        monitor
            .classify_and_record(TransactionSummary::new("0xevent").with_input("0x3ccfd60b"))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.hash, "0xevent");
        assert_eq!(event.event_type, "high_risk_detected");
        assert_eq!(event.source, ClassificationSource::PatternMatch);
    }

    #[test]
    fn test_from_config_rejects_bad_signatures() {
        let mut config = MonitorConfig::default();
        config.signatures = vec![Signature::new("", RiskTier::High, "x")];
        assert!(RiskMonitor::from_config(&config).is_err());
    }
}
