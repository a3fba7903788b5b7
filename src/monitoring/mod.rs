//! Prometheus metrics for the classification pipeline

use anyhow::Result;
use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::time::Duration;
use tracing::info;

use crate::risk_detection::{ClassificationSource, RiskTier};

pub struct PipelineMetrics {
    registry: Registry,

    pub classifications: CounterVec,
    pub short_circuits: Counter,
    pub analyzer_failures: Counter,
    pub fallbacks: Counter,
    pub rejected_inputs: Counter,
    pub analyzer_latency: Histogram,
}

impl PipelineMetrics {
    pub fn new() -> Result<Self> {
        info!("Initializing pipeline metrics");

        let registry = Registry::new();

        let classifications = CounterVec::new(
            Opts::new("risk_classifications_total", "Classified transactions by tier and source"),
            &["tier", "source"],
        )?;
        let short_circuits = Counter::new(
            "risk_short_circuits_total",
            "Classifications decided by signatures without the analyzer",
        )?;
        let analyzer_failures = Counter::new(
            "risk_analyzer_failures_total",
            "Secondary analyzer timeouts and transport errors",
        )?;
        let fallbacks = Counter::new(
            "risk_fallbacks_total",
            "Classifications that fell back to the pattern result",
        )?;
        let rejected_inputs = Counter::new(
            "risk_rejected_inputs_total",
            "Summaries rejected before classification",
        )?;
        let analyzer_latency = Histogram::with_opts(
            HistogramOpts::new("risk_analyzer_latency_ms", "Secondary analyzer latency (ms)")
                .buckets(vec![50.0, 100.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]),
        )?;

        registry.register(Box::new(classifications.clone()))?;
        registry.register(Box::new(short_circuits.clone()))?;
        registry.register(Box::new(analyzer_failures.clone()))?;
        registry.register(Box::new(fallbacks.clone()))?;
        registry.register(Box::new(rejected_inputs.clone()))?;
        registry.register(Box::new(analyzer_latency.clone()))?;

        Ok(Self {
            registry,
            classifications,
            short_circuits,
            analyzer_failures,
            fallbacks,
            rejected_inputs,
            analyzer_latency,
        })
    }

    /// Prometheus text exposition
    pub fn export_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn record_classification(&self, tier: RiskTier, source: ClassificationSource) {
        self.classifications
            .with_label_values(&[tier.as_str(), source.as_str()])
            .inc();
    }

    pub fn record_short_circuit(&self) {
        self.short_circuits.inc();
    }

    pub fn record_analyzer_failure(&self) {
        self.analyzer_failures.inc();
    }

    pub fn record_fallback(&self) {
        self.fallbacks.inc();
    }

    pub fn record_rejected_input(&self) {
        self.rejected_inputs.inc();
    }

    pub fn observe_analyzer_latency(&self, elapsed: Duration) {
        self.analyzer_latency.observe(elapsed.as_secs_f64() * 1000.0);
    }
}
