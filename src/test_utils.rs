use std::{fs, path::Path};

use itertools::Itertools;

use crate::{
    data_table::{FeatureTable, PerformanceTable},
    datastructures::*,
    error::{EvaluationError, Result},
    selector::{SchedulePredictor, SelectorBuilder},
};

/// A: 5, 50 and B: 10, 8 on instances i1, i2.
pub fn two_solver_table() -> PerformanceTable {
    PerformanceTable::from_rows(
        &["i1", "i2"],
        &["A", "B"],
        vec![vec![Some(5.0), Some(10.0)], vec![Some(50.0), Some(8.0)]],
    )
    .unwrap()
}

/// Features of i1, i2 whose first value is the instance's row index.
pub fn two_instance_features() -> FeatureTable {
    FeatureTable::from_rows(
        &["i1", "i2"],
        &["f1", "f2"],
        vec![vec![Some(0.0), Some(0.5)], vec![Some(1.0), None]],
    )
    .unwrap()
}

/// Runtime objective, cutoff 20, penalised time 200.
pub fn runtime_config() -> EvaluationConfig {
    EvaluationConfig::new(Objective::Runtime, 20.0)
}

pub fn quality_config(minimise: bool) -> EvaluationConfig {
    let objective = if minimise {
        Objective::QualityMinimise
    } else {
        Objective::QualityMaximise
    };
    EvaluationConfig::new(objective, 60.0)
}

/// How [`MockOracle`] picks the single scheduled solver.
pub enum Strategy {
    /// Best solver of the table that is still available, looked up with the
    /// first feature as row index.
    Oracle(PerformanceTable),
    /// First available solver of a fixed preference order.
    Fixed(Vec<Solver>),
}

/// Scripted selector whose artifact lists the solvers it was trained on.
pub struct MockOracle {
    pub strategy: Strategy,
    pub budget: f64,
    /// Construction fails once this solver is missing from the portfolio.
    pub fail_without: Option<Solver>,
    pub fail_all: bool,
    pub fail_predictions: bool,
    pub constructions: usize,
    pub predictions: usize,
}

impl MockOracle {
    pub fn new(strategy: Strategy, budget: f64) -> Self {
        Self {
            strategy,
            budget,
            fail_without: None,
            fail_all: false,
            fail_predictions: false,
            constructions: 0,
            predictions: 0,
        }
    }

    pub fn oracle() -> Self {
        MockOracle::new(Strategy::Oracle(two_solver_table()), 20.0)
    }

    pub fn fixed(preference: &[&str]) -> Self {
        MockOracle::new(
            Strategy::Fixed(preference.iter().map(|s| s.to_string()).collect()),
            20.0,
        )
    }
}

impl SelectorBuilder for MockOracle {
    fn construct_selector(
        &mut self,
        performance: &PerformanceTable,
        _features: &FeatureTable,
        output: &Path,
        _config: &EvaluationConfig,
    ) -> Result<bool> {
        self.constructions += 1;
        let missing_required = self
            .fail_without
            .as_ref()
            .map_or(false, |s| performance.column_position(s).is_none());
        if self.fail_all || missing_required {
            return Ok(false);
        }
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, performance.list_columns().join("\n"))?;
        Ok(true)
    }
}

impl SchedulePredictor for MockOracle {
    fn predict_schedule(
        &mut self,
        selector: &Path,
        feature_vector: &[f64],
    ) -> Result<Schedule> {
        self.predictions += 1;
        if self.fail_predictions {
            return Err(EvaluationError::external("mock", "prediction failed"));
        }
        let trained_on = fs::read_to_string(selector)?;
        let available = trained_on.lines().collect_vec();
        let solver = match &self.strategy {
            Strategy::Oracle(table) => {
                let row = feature_vector[0] as usize;
                available
                    .iter()
                    .filter_map(|s| {
                        let j = table.column_position(s)?;
                        table.value_at(row, j).map(|v| (*s, v))
                    })
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(s, _)| s.to_string())
            }
            Strategy::Fixed(preference) => preference
                .iter()
                .find(|s| available.contains(&s.as_str()))
                .cloned(),
        };
        Ok(solver
            .map(|s| vec![ScheduleStep::new(s, self.budget)])
            .unwrap_or_default())
    }
}
