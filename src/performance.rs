use itertools::Itertools;
use log::debug;
use ndarray::Array1;

use crate::{
    data_table::PerformanceTable,
    datastructures::*,
    error::{EvaluationError, Result},
};

/// Reference point each instance is scored against.
#[derive(Debug, Clone, PartialEq)]
pub enum CapValues {
    /// Runtime objectives: the global cutoff for every instance.
    Cutoff(f64),
    /// Quality objectives: one cap per instance, aligned with
    /// [`PerformanceTable::list_rows`].
    PerInstance(Array1<f64>),
}

impl CapValues {
    /// Derive the caps of the *current* table.
    ///
    /// Leave-one-out passes call this on the reduced table so the quality cap
    /// never refers to a solver that is no longer part of the portfolio.
    pub fn resolve(
        table: &PerformanceTable,
        config: &EvaluationConfig,
    ) -> Result<Self> {
        Ok(match capvalues(table, config.objective)? {
            Some(caps) => CapValues::PerInstance(caps),
            None => CapValues::Cutoff(config.cutoff_time),
        })
    }

    /// Caps of a leave-one-out `table`, derived like [`CapValues::resolve`].
    ///
    /// An instance whose remaining cells are all pending takes its cap from
    /// `full`, the caps of the table before the column was removed.
    pub fn resolve_reduced(
        table: &PerformanceTable,
        config: &EvaluationConfig,
        full: &CapValues,
    ) -> Result<Self> {
        if config.objective.is_runtime() {
            return Ok(CapValues::Cutoff(config.cutoff_time));
        }
        full.check_aligned(table.row_count())?;
        let caps = (0..table.row_count())
            .map(|i| match row_maximum(table, i) {
                Some(cap) => Ok(cap),
                None => full.get(i),
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(CapValues::PerInstance(Array1::from_vec(caps)))
    }

    /// Cap of the instance at `position`.
    pub fn get(&self, position: usize) -> Result<f64> {
        match self {
            CapValues::Cutoff(cutoff) => Ok(*cutoff),
            CapValues::PerInstance(caps) => {
                caps.get(position).copied().ok_or_else(|| {
                    EvaluationError::Configuration(format!(
                        "no cap value for instance position {position}"
                    ))
                })
            }
        }
    }

    /// Fail unless there is a cap for each of `num_instances` rows.
    pub fn check_aligned(&self, num_instances: usize) -> Result<()> {
        match self {
            CapValues::PerInstance(caps) if caps.len() != num_instances => {
                Err(EvaluationError::Configuration(format!(
                    "{} cap values for {num_instances} instances",
                    caps.len()
                )))
            }
            _ => Ok(()),
        }
    }
}

fn row_maximum(table: &PerformanceTable, position: usize) -> Option<f64> {
    table
        .row_values(position)
        .iter()
        .flatten()
        .copied()
        .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))))
}

/// Highest value per instance over all current solver columns.
pub fn maximum_per_instance(table: &PerformanceTable) -> Result<Array1<f64>> {
    table
        .list_rows()
        .iter()
        .enumerate()
        .map(|(i, instance)| {
            row_maximum(table, i).ok_or_else(|| {
                EvaluationError::Configuration(format!(
                    "no performance value to derive a cap for instance '{instance}'"
                ))
            })
        })
        .collect::<Result<Vec<f64>>>()
        .map(Array1::from_vec)
}

/// Per-instance caps for quality objectives, `None` for runtime where the
/// cutoff is used instead.
pub fn capvalues(
    table: &PerformanceTable,
    objective: Objective,
) -> Result<Option<Array1<f64>>> {
    if objective.is_runtime() {
        return Ok(None);
    }
    let caps = maximum_per_instance(table)?;
    debug!("Quality cap values per instance: {caps}");
    Ok(Some(caps))
}

/// Value charged for an unsuccessful run on an instance with cap `cap`.
pub fn penalised_value(config: &EvaluationConfig, cap: f64) -> f64 {
    if config.objective.is_runtime() {
        cap * config.penalty_multiplier
    } else {
        cap
    }
}

/// Runtime with values above the cutoff, or still pending, replaced by the
/// penalised time.
pub fn penalised_runtime(config: &EvaluationConfig, runtime: Option<f64>) -> f64 {
    match runtime {
        Some(t) if t <= config.cutoff_time => t,
        _ => config.penalised_time(),
    }
}

/// (instance, solver) pairs whose performance is still pending.
pub fn pending_jobs(table: &PerformanceTable) -> Vec<(Instance, Solver)> {
    table
        .list_rows()
        .iter()
        .enumerate()
        .flat_map(|(i, instance)| {
            table
                .list_columns()
                .iter()
                .enumerate()
                .filter(move |&(j, _)| table.value_at(i, j).is_none())
                .map(move |(_, solver)| (instance.clone(), solver.clone()))
        })
        .collect()
}

/// Penalised average runtime of every solver, best first.
pub fn solver_penalty_ranking(
    table: &PerformanceTable,
    config: &EvaluationConfig,
) -> Result<Vec<(Solver, f64)>> {
    if table.row_count() == 0 {
        return Err(EvaluationError::Configuration(
            "cannot rank solvers without instances".to_string(),
        ));
    }
    Ok(table
        .list_columns()
        .iter()
        .enumerate()
        .map(|(j, solver)| {
            let total: f64 = table
                .column_values(j)
                .iter()
                .map(|&v| penalised_runtime(config, v))
                .sum();
            (solver.clone(), total / table.row_count() as f64)
        })
        .sorted_by(|a, b| a.1.total_cmp(&b.1))
        .collect())
}
