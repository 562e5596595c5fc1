use log::debug;
use ndarray::Array1;

use crate::{
    data_table::PerformanceTable,
    datastructures::*,
    error::{EvaluationError, Result},
    performance::{penalised_runtime, CapValues},
};

/// Best known value per instance over all columns, `None` where every cell of
/// the instance is pending.
pub fn best_per_instance(
    table: &PerformanceTable,
    minimise: bool,
) -> Result<Vec<Option<f64>>> {
    if table.column_count() == 0 {
        return Err(EvaluationError::Configuration(
            "the virtual best solver of an empty portfolio is undefined"
                .to_string(),
        ));
    }
    Ok((0..table.row_count())
        .map(|i| {
            table.row_values(i).iter().flatten().copied().reduce(|a, b| {
                if (minimise && b < a) || (!minimise && b > a) {
                    b
                } else {
                    a
                }
            })
        })
        .collect())
}

/// Score of the perfect selector for the current column set.
///
/// For minimised objectives every instance contributes its benefit
/// `cap - best`, clipped at zero once the best solver does not beat the cap;
/// otherwise the best value itself. Higher is always better.
///
/// An instance whose cells are all pending is unsolved and contributes zero.
pub fn score(
    table: &PerformanceTable,
    aggregation: Aggregation,
    minimise: bool,
    caps: &CapValues,
) -> Result<f64> {
    caps.check_aligned(table.row_count())?;
    let best = best_per_instance(table, minimise)?;
    let per_instance = best
        .iter()
        .enumerate()
        .map(|(i, best)| match (best, minimise) {
            (Some(best), true) => Ok((caps.get(i)? - best).max(0.0)),
            (Some(best), false) => Ok(*best),
            (None, _) => Ok(0.0),
        })
        .collect::<Result<Vec<f64>>>()?;
    let per_instance = Array1::from_vec(per_instance);
    debug!("Virtual best score per instance: {per_instance}");
    Ok(aggregation.apply(per_instance.view()))
}

/// Virtual best performance in the same framing the actual selector is
/// scored in: raw best values with unsolved instances penalised.
///
/// Used in place of an actual selector that could not be built.
pub fn penalised_score(
    table: &PerformanceTable,
    config: &EvaluationConfig,
    caps: &CapValues,
) -> Result<f64> {
    caps.check_aligned(table.row_count())?;
    let best = best_per_instance(table, config.minimise())?;
    let per_instance = best
        .iter()
        .enumerate()
        .map(|(i, &best)| -> Result<f64> {
            if config.objective.is_runtime() {
                Ok(penalised_runtime(config, best))
            } else {
                match best {
                    Some(value) => Ok(value),
                    None => caps.get(i),
                }
            }
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(config.aggregation().apply(Array1::from_vec(per_instance).view()))
}

#[cfg(test)]
mod tests;
