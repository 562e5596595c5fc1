use std::path::Path;

use itertools::Itertools;
use log::{debug, info};
use ndarray::Array1;

use crate::{
    data_table::{FeatureTable, PerformanceTable},
    datastructures::*,
    error::{EvaluationError, Result},
    features::{feature_vector, impute_missing_values},
    performance::{penalised_value, CapValues},
    schedule_simulator::simulate,
    selector::SchedulePredictor,
};

/// Per-instance performance of the selector at `selector`, in the order of
/// [`PerformanceTable::list_rows`].
///
/// Every instance whose replayed schedule does not solve it is charged
/// [`penalised_value`] of its cap, whatever the simulation realised.
pub fn instance_scores<P: SchedulePredictor + ?Sized>(
    predictor: &mut P,
    selector: &Path,
    performance: &PerformanceTable,
    features: &FeatureTable,
    config: &EvaluationConfig,
    caps: &CapValues,
) -> Result<Array1<f64>> {
    caps.check_aligned(performance.row_count())?;
    let features = impute_missing_values(features)?;
    let mut scores = Vec::with_capacity(performance.row_count());
    for (i, instance) in performance.list_rows().iter().enumerate() {
        let in_context = |e: EvaluationError| {
            e.context(format!("instance '{instance}'"))
        };
        let cap = caps.get(i)?;
        let vector = feature_vector(&features, instance).map_err(in_context)?;
        let schedule = predictor
            .predict_schedule(selector, &vector)
            .map_err(in_context)?;
        let outcome = simulate(
            &schedule,
            performance,
            instance,
            config.objective,
            config.cutoff_time,
            cap,
        )
        .map_err(in_context)?;
        let score = if outcome.solved {
            outcome.performance
        } else {
            penalised_value(config, cap)
        };
        debug!(
            "{instance}: schedule [{}] -> {} (solved: {}), scored {score}",
            schedule.iter().join(", "),
            outcome.performance,
            outcome.solved
        );
        scores.push(score);
    }
    Ok(Array1::from_vec(scores))
}

/// Aggregated performance of the trained selector at `selector` over all
/// instances of `performance`.
pub fn score<P: SchedulePredictor + ?Sized>(
    predictor: &mut P,
    selector: &Path,
    performance: &PerformanceTable,
    features: &FeatureTable,
    config: &EvaluationConfig,
    caps: &CapValues,
) -> Result<f64> {
    info!(
        "Computing actual performance for portfolio selector {}",
        selector.display()
    );
    let scores =
        instance_scores(predictor, selector, performance, features, config, caps)?;
    let score = config.aggregation().apply(scores.view());
    info!("Actual performance for portfolio selector: {score}");
    Ok(score)
}

#[cfg(test)]
mod tests;
