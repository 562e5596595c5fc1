use std::{fs, path::Path};

use sparkle_portfolio::{
    data_table::{FeatureTable, PerformanceTable},
    datastructures::*,
    error::Result,
    selector::{SchedulePredictor, SelectorBuilder},
};

/// Selector that schedules the best known solver for the instance whose row
/// index is the first feature value.
///
/// The artifact lists the solvers the selector was built for.
pub struct ReplayOracle {
    pub performance: PerformanceTable,
    pub budget: f64,
    pub fail_without: Option<String>,
    pub constructions: usize,
}

impl ReplayOracle {
    pub fn new(performance: &PerformanceTable, budget: f64) -> Self {
        Self {
            performance: performance.clone(),
            budget,
            fail_without: None,
            constructions: 0,
        }
    }
}

impl SelectorBuilder for ReplayOracle {
    fn construct_selector(
        &mut self,
        performance: &PerformanceTable,
        _features: &FeatureTable,
        output: &Path,
        _config: &EvaluationConfig,
    ) -> Result<bool> {
        self.constructions += 1;
        if let Some(required) = &self.fail_without {
            if performance.column_position(required).is_none() {
                return Ok(false);
            }
        }
        fs::create_dir_all(output.parent().unwrap())?;
        fs::write(output, performance.list_columns().join("\n"))?;
        Ok(true)
    }
}

impl SchedulePredictor for ReplayOracle {
    fn predict_schedule(
        &mut self,
        selector: &Path,
        feature_vector: &[f64],
    ) -> Result<Schedule> {
        let available = fs::read_to_string(selector)?;
        let row = feature_vector[0] as usize;
        let best = available
            .lines()
            .filter_map(|solver| {
                let j = self.performance.column_position(solver)?;
                self.performance.value_at(row, j).map(|v| (solver, v))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));
        Ok(best
            .map(|(solver, _)| vec![ScheduleStep::new(solver, self.budget)])
            .unwrap_or_default())
    }
}

pub fn load(path: &str) -> PerformanceTable {
    PerformanceTable::load(Path::new(path)).unwrap()
}
