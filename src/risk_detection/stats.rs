//! Rolling classification statistics
//!
//! One mutex serializes every update; `read()` hands out an owned snapshot so
//! callers never touch the live counters.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::risk_detection::{rules::RiskTier, ClassificationSource, StoredTransaction};

/// Per-tier counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskDistribution {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub critical: u64,
}

impl RiskDistribution {
    fn increment(&mut self, tier: RiskTier) {
        match tier {
            RiskTier::Low => self.low += 1,
            RiskTier::Medium => self.medium += 1,
            RiskTier::High => self.high += 1,
            RiskTier::Critical => self.critical += 1,
        }
    }

    pub fn get(&self, tier: RiskTier) -> u64 {
        match tier {
            RiskTier::Low => self.low,
            RiskTier::Medium => self.medium,
            RiskTier::High => self.high,
            RiskTier::Critical => self.critical,
        }
    }

    pub fn total(&self) -> u64 {
        self.low + self.medium + self.high + self.critical
    }

    /// Display buckets in tier order
    pub fn buckets(&self) -> Vec<DistributionBucket> {
        RiskTier::ALL
            .iter()
            .map(|tier| DistributionBucket {
                name: tier.display_name().to_string(),
                tier: *tier,
                value: self.get(*tier),
                color: tier.color().to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionBucket {
    pub name: String,
    pub tier: RiskTier,
    pub value: u64,
    pub color: String,
}

/// Latest-known network and service status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    pub current_block: u64,
    pub gas_price: Decimal,
    pub monitoring_status: String,
    pub analyzer_status: String,
}

impl Default for NetworkSnapshot {
    fn default() -> Self {
        Self {
            current_block: 0,
            gas_price: Decimal::ZERO,
            monitoring_status: "Starting...".to_string(),
            analyzer_status: "Initializing...".to_string(),
        }
    }
}

/// Most recent generative-model report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestAnalysis {
    pub transaction_hash: String,
    pub report: String,
    pub tier: RiskTier,
}

#[derive(Debug, Default)]
struct StatsState {
    protected_transactions: u64,
    high_risk_detected: u64,
    medium_risk: u64,
    distribution: RiskDistribution,
    network: NetworkSnapshot,
    latest_analysis: Option<LatestAnalysis>,
}

/// Immutable copy of the aggregate state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub protected_transactions: u64,
    pub high_risk_detected: u64,
    pub medium_risk: u64,
    #[serde(skip)]
    pub distribution: RiskDistribution,
    pub risk_distribution: Vec<DistributionBucket>,
    pub network_stats: NetworkSnapshot,
    pub latest_analysis: Option<LatestAnalysis>,
}

#[derive(Debug, Default)]
pub struct StatsAggregator {
    state: Mutex<StatsState>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one classified transaction into the counters
    pub fn update(&self, stored: &StoredTransaction) {
        let tier = stored.classification.tier;
        let mut state = self.state.lock();

        state.protected_transactions += 1;
        match tier {
            RiskTier::High | RiskTier::Critical => state.high_risk_detected += 1,
            RiskTier::Medium => state.medium_risk += 1,
            RiskTier::Low => {}
        }
        state.distribution.increment(tier);

        // Out-of-order block numbers overwrite; no ordering is guaranteed upstream
        if let Some(block) = stored.transaction.block_number {
            state.network.current_block = block;
        }
        if let Some(gas_price) = stored.transaction.gas_price {
            state.network.gas_price = gas_price;
        }
        state.network.monitoring_status = "Active".to_string();

        match stored.classification.source {
            ClassificationSource::SecondaryAnalysis => {
                state.network.analyzer_status = "Online".to_string();
                state.latest_analysis = Some(LatestAnalysis {
                    transaction_hash: stored.transaction.hash.clone(),
                    report: stored.classification.message.clone(),
                    tier,
                });
            }
            ClassificationSource::PatternFallback => {
                state.network.analyzer_status = "Degraded".to_string();
            }
            ClassificationSource::PatternMatch => {}
        }
    }

    pub fn read(&self) -> StatsSnapshot {
        let state = self.state.lock();
        StatsSnapshot {
            protected_transactions: state.protected_transactions,
            high_risk_detected: state.high_risk_detected,
            medium_risk: state.medium_risk,
            distribution: state.distribution,
            risk_distribution: state.distribution.buckets(),
            network_stats: state.network.clone(),
            latest_analysis: state.latest_analysis.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk_detection::{ClassificationResult, TransactionSummary};
    use std::str::FromStr;
    use std::sync::Arc;

    fn stored(tier: RiskTier, source: ClassificationSource) -> StoredTransaction {
        StoredTransaction::new(
            TransactionSummary::new("0xabc"),
            ClassificationResult::new(tier, "msg", source),
        )
    }

    #[test]
    fn test_counters_follow_tier() {
        let stats = StatsAggregator::new();
        stats.update(&stored(RiskTier::Low, ClassificationSource::PatternFallback));
        stats.update(&stored(RiskTier::Medium, ClassificationSource::PatternFallback));
        stats.update(&stored(RiskTier::High, ClassificationSource::PatternMatch));
        stats.update(&stored(RiskTier::Critical, ClassificationSource::SecondaryAnalysis));

        let snapshot = stats.read();
        assert_eq!(snapshot.protected_transactions, 4);
        assert_eq!(snapshot.high_risk_detected, 2);
        assert_eq!(snapshot.medium_risk, 1);
        assert_eq!(snapshot.distribution.total(), snapshot.protected_transactions);
        for tier in RiskTier::ALL {
            assert_eq!(snapshot.distribution.get(tier), 1);
        }
    }

    #[test]
    fn test_buckets_use_exact_tiers() {
        let stats = StatsAggregator::new();
        stats.update(&stored(RiskTier::High, ClassificationSource::PatternMatch));

        let snapshot = stats.read();
        let high = snapshot
            .risk_distribution
            .iter()
            .find(|b| b.name == "High Risk")
            .unwrap();
        assert_eq!(high.value, 1);
        assert_eq!(snapshot.risk_distribution.iter().map(|b| b.value).sum::<u64>(), 1);
    }

    #[test]
    fn test_network_snapshot_overwrites() {
        let stats = StatsAggregator::new();
        assert_eq!(stats.read().network_stats.monitoring_status, "Starting...");

        let mut tx = stored(RiskTier::Low, ClassificationSource::PatternFallback);
        tx.transaction.block_number = Some(200);
        tx.transaction.gas_price = Some(Decimal::from_str("31.5").unwrap());
        stats.update(&tx);

        let mut older = stored(RiskTier::Low, ClassificationSource::PatternMatch);
        older.transaction.block_number = Some(150);
        stats.update(&older);

        let network = stats.read().network_stats;
        assert_eq!(network.current_block, 150);
        assert_eq!(network.gas_price, Decimal::from_str("31.5").unwrap());
        assert_eq!(network.monitoring_status, "Active");
        assert_eq!(network.analyzer_status, "Degraded");
    }

    #[test]
    fn test_latest_analysis_tracks_secondary_results() {
        let stats = StatsAggregator::new();
        stats.update(&stored(RiskTier::High, ClassificationSource::PatternMatch));
        assert!(stats.read().latest_analysis.is_none());

        stats.update(&stored(RiskTier::Medium, ClassificationSource::SecondaryAnalysis));
        let snapshot = stats.read();
        let latest = snapshot.latest_analysis.unwrap();
        assert_eq!(latest.transaction_hash, "0xabc");
        assert_eq!(latest.tier, RiskTier::Medium);
        assert_eq!(snapshot.network_stats.analyzer_status, "Online");
    }

    #[test]
    fn test_snapshot_is_detached() {
        let stats = StatsAggregator::new();
        let before = stats.read();
        stats.update(&stored(RiskTier::Low, ClassificationSource::PatternFallback));
        assert_eq!(before.protected_transactions, 0);
        assert_eq!(stats.read().protected_transactions, 1);
    }

    #[test]
    fn test_concurrent_updates_lose_nothing() {
        let stats = Arc::new(StatsAggregator::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        let tier = RiskTier::ALL[(t + i) % 4];
                        stats.update(&stored(tier, ClassificationSource::PatternFallback));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.read();
        assert_eq!(snapshot.protected_transactions, 1000);
        assert_eq!(snapshot.distribution.total(), 1000);
    }
}
