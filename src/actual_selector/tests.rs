use super::*;
use crate::{error::EvaluationError, selector::SelectorBuilder, test_utils::*};

fn build(oracle: &mut MockOracle, table: &PerformanceTable) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let built = oracle
        .construct_selector(
            table,
            &two_instance_features(),
            &dir.path().join("portfolio_selector"),
            &runtime_config(),
        )
        .unwrap();
    assert!(built);
    dir
}

#[test]
fn test_oracle_selector_matches_virtual_best() {
    let mut oracle = MockOracle::oracle();
    let table = two_solver_table();
    let dir = build(&mut oracle, &table);
    let config = runtime_config();
    let caps = CapValues::resolve(&table, &config).unwrap();
    let selector = dir.path().join("portfolio_selector");
    assert_eq!(
        instance_scores(
            &mut oracle,
            &selector,
            &table,
            &two_instance_features(),
            &config,
            &caps
        )
        .unwrap()
        .to_vec(),
        vec![5.0, 8.0]
    );
    assert_eq!(
        score(&mut oracle, &selector, &table, &two_instance_features(), &config, &caps)
            .unwrap(),
        13.0
    );
    assert_eq!(oracle.predictions, 4);
}

#[test]
fn test_unsolved_instances_are_penalised() {
    // A never finishes i2 inside the cutoff: 5 + 20 * 10
    let mut oracle = MockOracle::fixed(&["A", "B"]);
    let table = two_solver_table();
    let dir = build(&mut oracle, &table);
    let config = runtime_config();
    let caps = CapValues::resolve(&table, &config).unwrap();
    assert_eq!(
        score(
            &mut oracle,
            &dir.path().join("portfolio_selector"),
            &table,
            &two_instance_features(),
            &config,
            &caps
        )
        .unwrap(),
        205.0
    );
}

#[test]
fn test_empty_schedule_is_penalised() {
    let mut oracle = MockOracle::fixed(&["C"]);
    let table = two_solver_table();
    let dir = build(&mut oracle, &table);
    let config = runtime_config();
    let caps = CapValues::Cutoff(20.0);
    assert_eq!(
        score(
            &mut oracle,
            &dir.path().join("portfolio_selector"),
            &table,
            &two_instance_features(),
            &config,
            &caps
        )
        .unwrap(),
        400.0
    );
}

#[test]
fn test_prediction_failure_names_the_instance() {
    let mut oracle = MockOracle::oracle();
    let table = two_solver_table();
    let dir = build(&mut oracle, &table);
    oracle.fail_predictions = true;
    let result = score(
        &mut oracle,
        &dir.path().join("portfolio_selector"),
        &table,
        &two_instance_features(),
        &runtime_config(),
        &CapValues::Cutoff(20.0),
    );
    match result {
        Err(EvaluationError::ExternalTool { message, .. }) => {
            assert!(message.contains("instance 'i1'"), "{message}")
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_missing_features_for_instance() {
    let mut oracle = MockOracle::oracle();
    let table = two_solver_table();
    let dir = build(&mut oracle, &table);
    let mut features = two_instance_features();
    features.remove_row("i2").unwrap();
    assert!(matches!(
        score(
            &mut oracle,
            &dir.path().join("portfolio_selector"),
            &table,
            &features,
            &runtime_config(),
            &CapValues::Cutoff(20.0),
        ),
        Err(EvaluationError::DataIntegrity(_))
    ));
}
