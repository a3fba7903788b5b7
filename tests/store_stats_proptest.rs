//! Property tests for the bounded store and the stats counters

use proptest::prelude::*;
use tx_risk_monitor::risk_detection::{
    ClassificationResult, ClassificationSource, RiskTier, StatsAggregator, StoredTransaction,
    TransactionStore, TransactionSummary,
};

fn tier_strategy() -> impl Strategy<Value = RiskTier> {
    prop_oneof![
        Just(RiskTier::Low),
        Just(RiskTier::Medium),
        Just(RiskTier::High),
        Just(RiskTier::Critical),
    ]
}

fn source_strategy() -> impl Strategy<Value = ClassificationSource> {
    prop_oneof![
        Just(ClassificationSource::PatternMatch),
        Just(ClassificationSource::SecondaryAnalysis),
        Just(ClassificationSource::PatternFallback),
    ]
}

fn stored(index: usize, tier: RiskTier, source: ClassificationSource) -> StoredTransaction {
    StoredTransaction::new(
        TransactionSummary::new(format!("0x{:06x}", index)),
        ClassificationResult::new(tier, "finding", source),
    )
}

proptest! {
    #[test]
    fn store_keeps_most_recent_capacity_entries(
        capacity in 1usize..32,
        tiers in prop::collection::vec(tier_strategy(), 0..100),
    ) {
        let store = TransactionStore::new(capacity).unwrap();
        for (i, tier) in tiers.iter().enumerate() {
            store.add(stored(i, *tier, ClassificationSource::PatternFallback));
        }

        let snapshot = store.list(None);
        prop_assert_eq!(snapshot.len(), tiers.len().min(capacity));

        // Most recent first, contiguous from the newest insert
        for (offset, entry) in snapshot.iter().enumerate() {
            let expected = tiers.len() - 1 - offset;
            prop_assert_eq!(&entry.transaction.hash, &format!("0x{:06x}", expected));
        }
    }

    #[test]
    fn filtered_list_is_subset_in_order(
        tiers in prop::collection::vec(tier_strategy(), 0..60),
        filter in tier_strategy(),
    ) {
        let store = TransactionStore::new(40).unwrap();
        for (i, tier) in tiers.iter().enumerate() {
            store.add(stored(i, *tier, ClassificationSource::PatternMatch));
        }

        let all = store.list(None);
        let filtered = store.list(Some(filter));
        let expected: Vec<_> = all
            .into_iter()
            .filter(|entry| entry.classification.tier == filter)
            .collect();
        prop_assert_eq!(filtered, expected);
    }

    #[test]
    fn distribution_sums_to_protected(
        entries in prop::collection::vec((tier_strategy(), source_strategy()), 0..200),
    ) {
        let stats = StatsAggregator::new();
        for (i, (tier, source)) in entries.iter().enumerate() {
            stats.update(&stored(i, *tier, *source));
        }

        let snapshot = stats.read();
        let bucket_total: u64 = snapshot.risk_distribution.iter().map(|b| b.value).sum();
        prop_assert_eq!(snapshot.protected_transactions, entries.len() as u64);
        prop_assert_eq!(bucket_total, snapshot.protected_transactions);
        prop_assert_eq!(snapshot.distribution.total(), snapshot.protected_transactions);

        let high = entries
            .iter()
            .filter(|(tier, _)| tier.is_actionable())
            .count() as u64;
        prop_assert_eq!(snapshot.high_risk_detected, high);
        prop_assert!(snapshot.high_risk_detected + snapshot.medium_risk <= snapshot.protected_transactions);
    }
}
