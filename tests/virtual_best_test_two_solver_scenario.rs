use sparkle_portfolio::{
    datastructures::*, error::EvaluationError, performance::CapValues,
    virtual_best,
};

mod common;

#[test]
fn test_two_solver_scenario() {
    let table = common::load("data/test/performance_data.csv");
    let config = EvaluationConfig::new(Objective::Runtime, 20.0);
    let caps = CapValues::resolve(&table, &config).unwrap();
    assert_eq!(caps, CapValues::Cutoff(20.0));
    assert_eq!(
        virtual_best::score(&table, config.aggregation(), true, &caps).unwrap(),
        27.0
    );
    // B was the only solver below the cutoff on i2
    let without_b = table.without_column("B").unwrap();
    assert_eq!(
        virtual_best::score(&without_b, config.aggregation(), true, &caps)
            .unwrap(),
        15.0
    );
    let empty = without_b.without_column("A").unwrap();
    assert!(matches!(
        virtual_best::score(&empty, config.aggregation(), true, &caps),
        Err(EvaluationError::Configuration(_))
    ));
}
