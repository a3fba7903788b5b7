//! Terminal dashboard
//!
//! Periodic pull against the monitor's read surface. The loop never touches
//! the classification path; it only reads snapshots.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::risk_detection::{StatsSnapshot, StoredTransaction};
use crate::service::RiskMonitor;

pub struct Dashboard {
    monitor: Arc<RiskMonitor>,
    refresh: Duration,
}

impl Dashboard {
    pub fn new(monitor: Arc<RiskMonitor>, refresh: Duration) -> Self {
        Self { monitor, refresh }
    }

    /// Current frame as text lines
    pub fn render(&self) -> Vec<String> {
        render_frame(&self.monitor.dashboard_transactions(), &self.monitor.read_stats())
    }

    /// Redraw every `refresh` until `shutdown` fires
    pub async fn run(self, shutdown: CancellationToken) {
        info!(refresh_secs = self.refresh.as_secs(), "Dashboard started");
        let mut ticker = tokio::time::interval(self.refresh);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if !draw(&self.render()) {
                        debug!("stdout closed, stopping dashboard");
                        break;
                    }
                }
            }
        }

        info!("Dashboard stopped");
    }
}

fn draw(lines: &[String]) -> bool {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}\n", lines.join("\n")).is_ok()
}

/// Render transactions (most recent first) under a stats header
pub fn render_frame(transactions: &[StoredTransaction], stats: &StatsSnapshot) -> Vec<String> {
    let mut lines = vec![
        "=== Live Ethereum Transaction Monitoring (AI Risk Analysis) ===".to_string(),
        format!(
            "Protected: {} | High risk: {} | Medium risk: {} | Block: {} | Gas: {} Gwei | Analyzer: {}",
            stats.protected_transactions,
            stats.high_risk_detected,
            stats.medium_risk,
            stats.network_stats.current_block,
            stats.network_stats.gas_price,
            stats.network_stats.analyzer_status,
        ),
    ];

    if transactions.is_empty() {
        lines.push("No transactions detected yet...".to_string());
        return lines;
    }

    for stored in transactions {
        let tx = &stored.transaction;
        let result = &stored.classification;
        lines.push(format!("[{}] {}", result.tier.display_name(), tx.hash));
        lines.push(format!(
            "    from {} to {} | {} ETH | gas {} Gwei",
            tx.from_address.as_deref().unwrap_or("N/A"),
            tx.to_address.as_deref().unwrap_or("N/A"),
            tx.value,
            tx.gas_price
                .map(|g| g.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
        ));
        lines.push(format!("    {}", summary_line(&result.message)));
    }

    lines
}

/// First non-empty line of a finding, for one-line display
fn summary_line(message: &str) -> &str {
    message
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && *line != "AI Analysis:")
        .unwrap_or("AI analysis not available.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::PipelineMetrics;
    use crate::risk_detection::{
        ClassificationResult, ClassificationSource, DisabledAnalyzer, HybridClassifier,
        PatternMatcher, RiskTier, StatsAggregator, TransactionStore, TransactionSummary,
    };

    fn idle_monitor() -> Arc<RiskMonitor> {
        let metrics = Arc::new(PipelineMetrics::new().unwrap());
        let classifier = HybridClassifier::new(PatternMatcher::default(), Arc::new(DisabledAnalyzer));
        Arc::new(RiskMonitor::new(
            classifier,
            TransactionStore::new(10).unwrap(),
            TransactionStore::new(5).unwrap(),
            metrics,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_when_already_cancelled() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let dashboard = Dashboard::new(idle_monitor(), Duration::from_secs(2));
        tokio::time::timeout(Duration::from_secs(1), dashboard.run(shutdown))
            .await
            .expect("run returns after cancellation");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_keeps_ticking_until_cancelled() {
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(Dashboard::new(idle_monitor(), Duration::from_secs(2)).run(shutdown.clone()));

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(!handle.is_finished());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("run returns after cancellation")
            .unwrap();
    }

    #[test]
    fn test_empty_frame() {
        let stats = StatsAggregator::new().read();
        let lines = render_frame(&[], &stats);
        assert!(lines.iter().any(|l| l.contains("No transactions detected yet")));
    }

    #[test]
    fn test_frame_lists_transactions() {
        let stored = StoredTransaction::new(
            TransactionSummary::new("0xabc").with_addresses(Some("0xfrom".into()), None),
            ClassificationResult::new(
                RiskTier::Medium,
                "AI Analysis:\nPossible phishing approval",
                ClassificationSource::SecondaryAnalysis,
            ),
        );
        let stats = StatsAggregator::new();
        stats.update(&stored);

        let lines = render_frame(&[stored], &stats.read());
        assert!(lines[1].contains("Protected: 1"));
        assert!(lines.iter().any(|l| l == "[Medium Risk] 0xabc"));
        assert!(lines.iter().any(|l| l.contains("from 0xfrom to N/A")));
        assert!(lines.iter().any(|l| l.trim() == "Possible phishing approval"));
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(summary_line("AI Analysis:\n\n  first  \nsecond"), "first");
        assert_eq!(summary_line(""), "AI analysis not available.");
    }
}
