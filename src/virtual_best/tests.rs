use std::path::PathBuf;

use super::*;
use crate::test_utils::*;

#[test]
fn test_two_solver_scenario() {
    let table = two_solver_table();
    let caps = CapValues::Cutoff(20.0);
    // min(5, 10) = 5 and min(50, 8) = 8: (20 - 5) + (20 - 8)
    assert_eq!(
        best_per_instance(&table, true).unwrap(),
        vec![Some(5.0), Some(8.0)]
    );
    assert_eq!(score(&table, Aggregation::Sum, true, &caps).unwrap(), 27.0);
}

#[test]
fn test_benefit_is_clipped_beyond_cutoff() {
    let table = two_solver_table().without_column("B").unwrap();
    let caps = CapValues::Cutoff(20.0);
    // 20 - 50 would be negative, the instance contributes nothing
    assert_eq!(score(&table, Aggregation::Sum, true, &caps).unwrap(), 15.0);
}

#[test]
fn test_single_solver_is_its_own_virtual_best() {
    let table =
        PerformanceTable::load(&PathBuf::from("data/test/quality_data.csv"))
            .unwrap();
    let single = table
        .without_column("A")
        .unwrap()
        .without_column("C")
        .unwrap();
    let caps = CapValues::resolve(&single, &quality_config(false)).unwrap();
    assert_eq!(
        score(&single, Aggregation::Mean, false, &caps).unwrap(),
        (30.0 + 25.0 + 11.0) / 3.0
    );
    let runtime = two_solver_table().without_column("A").unwrap();
    assert_eq!(
        score(&runtime, Aggregation::Sum, true, &CapValues::Cutoff(20.0))
            .unwrap(),
        (20.0 - 10.0) + (20.0 - 8.0)
    );
}

#[test]
fn test_empty_portfolio_is_a_configuration_error() {
    let table = two_solver_table()
        .without_column("A")
        .unwrap()
        .without_column("B")
        .unwrap();
    assert!(matches!(
        score(&table, Aggregation::Sum, true, &CapValues::Cutoff(20.0)),
        Err(EvaluationError::Configuration(_))
    ));
}

#[test]
fn test_quality_minimise_uses_instance_caps() {
    let table =
        PerformanceTable::load(&PathBuf::from("data/test/quality_data.csv"))
            .unwrap();
    let config = quality_config(true);
    let caps = CapValues::resolve(&table, &config).unwrap();
    // caps 30, 40, 11 and best 7, 25, 9
    assert_eq!(
        score(&table, Aggregation::Sum, true, &caps).unwrap(),
        23.0 + 15.0 + 2.0
    );
}

#[test]
fn test_instance_without_values() {
    let table = PerformanceTable::from_rows(
        &["i1", "i2"],
        &["A"],
        vec![vec![Some(1.0)], vec![None]],
    )
    .unwrap();
    // the pending instance is unsolved and brings no benefit
    assert_eq!(
        score(&table, Aggregation::Sum, true, &CapValues::Cutoff(20.0))
            .unwrap(),
        19.0
    );
    assert_eq!(
        score(&table, Aggregation::Sum, false, &CapValues::Cutoff(20.0))
            .unwrap(),
        1.0
    );
    // the penalised variant charges the pending instance instead
    assert_eq!(
        penalised_score(&table, &runtime_config(), &CapValues::Cutoff(20.0))
            .unwrap(),
        1.0 + 200.0
    );
}

#[test]
fn test_penalised_score() {
    let config = runtime_config();
    let caps = CapValues::Cutoff(20.0);
    let table = two_solver_table();
    assert_eq!(penalised_score(&table, &config, &caps).unwrap(), 5.0 + 8.0);
    let only_a = table.without_column("B").unwrap();
    assert_eq!(
        penalised_score(&only_a, &config, &caps).unwrap(),
        5.0 + 200.0
    );
}
