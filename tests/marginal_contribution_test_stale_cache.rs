use std::fs;

use sparkle_portfolio::{
    data_table::PerformanceTable, datastructures::*,
    marginal_contribution::MarginalContributionEngine,
};

mod common;
use common::ReplayOracle;

#[test]
fn test_stale_cache() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("performance_data.csv");
    fs::copy("data/test/performance_data.csv", &data).unwrap();
    let table = PerformanceTable::load(&data).unwrap();
    let config = EvaluationConfig::new(Objective::Runtime, 20.0);
    let mut oracle = ReplayOracle::new(&table, 20.0);
    let output = dir.path().join("Output");
    let first = MarginalContributionEngine::new(&config, &mut oracle, &output)
        .compute_perfect(&table)
        .unwrap();
    assert!(output.join("marginal_contribution_perfect.csv").is_file());

    // the data file changes after the ranking was cached
    fs::write(&data, ",A,B\ni1,5,10\ni2,1,8\n").unwrap();
    let changed = PerformanceTable::load(&data).unwrap();
    let cached = MarginalContributionEngine::new(&config, &mut oracle, &output)
        .compute_perfect(&changed)
        .unwrap();
    assert!(cached.from_cache);
    assert_eq!(cached.records, first.records);

    let checking = EvaluationConfig {
        cache_policy: CachePolicy::CheckFingerprint,
        ..config.clone()
    };
    let recomputed =
        MarginalContributionEngine::new(&checking, &mut oracle, &output)
            .compute_perfect(&changed)
            .unwrap();
    assert!(!recomputed.from_cache);
    assert_ne!(recomputed.records, first.records);

    let forced = EvaluationConfig {
        force_recompute: true,
        ..config
    };
    let again = MarginalContributionEngine::new(&forced, &mut oracle, &output)
        .compute_perfect(&changed)
        .unwrap();
    assert!(!again.from_cache);
    assert_eq!(again.records, recomputed.records);
}
