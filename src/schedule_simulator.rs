use log::trace;

use crate::{
    data_table::PerformanceTable,
    datastructures::*,
    error::{EvaluationError, Result},
};

/// Replay `schedule` on `instance` using the recorded performance data.
///
/// Runtime objectives walk the schedule and spend each solver's slice until
/// one finishes inside it; quality objectives only look at the first
/// scheduled solver and compare it against `cap`. The table is never
/// modified and no solver is run.
///
/// An empty schedule is unsolved with realised performance `cap`.
pub fn simulate(
    schedule: &[ScheduleStep],
    table: &PerformanceTable,
    instance: &str,
    objective: Objective,
    cutoff: f64,
    cap: f64,
) -> Result<SimulationOutcome> {
    let row = table.row_position(instance).ok_or_else(|| {
        EvaluationError::DataIntegrity(format!(
            "instance '{instance}' is not part of the performance data"
        ))
    })?;
    if schedule.is_empty() {
        trace!("Empty schedule for {instance}");
        return Ok(SimulationOutcome::unsolved(cap));
    }
    let lookup = |solver: &str| -> Result<Option<f64>> {
        let column = table.column_position(solver).ok_or_else(|| {
            EvaluationError::DataIntegrity(format!(
                "scheduled solver '{solver}' is not part of the performance data"
            ))
            .context(format!("instance '{instance}'"))
        })?;
        Ok(table.value_at(row, column))
    };
    if objective.is_runtime() {
        simulate_runtime(schedule, lookup, cutoff)
    } else {
        let first = &schedule[0];
        Ok(match lookup(&first.solver)? {
            Some(value)
                if (objective.minimise() && value < cap)
                    || (!objective.minimise() && value > cap) =>
            {
                SimulationOutcome::solved(value)
            }
            Some(value) => SimulationOutcome::unsolved(value),
            None => SimulationOutcome::unsolved(cap),
        })
    }
}

fn simulate_runtime(
    schedule: &[ScheduleStep],
    lookup: impl Fn(&str) -> Result<Option<f64>>,
    cutoff: f64,
) -> Result<SimulationOutcome> {
    let mut used_time = 0.0;
    // first minimum wins ties
    let mut best_seen: Option<f64> = None;
    for step in schedule {
        if used_time >= cutoff {
            return Ok(SimulationOutcome::unsolved(used_time));
        }
        // a pending run never finishes inside its slice
        let required = lookup(&step.solver)?.unwrap_or(f64::INFINITY);
        if required.is_finite() && best_seen.map_or(true, |b| required < b) {
            best_seen = Some(required);
        }
        if required <= step.budget {
            used_time += required;
            trace!("{step} finished after {used_time} of {cutoff}");
            return Ok(if used_time <= cutoff {
                SimulationOutcome::solved(used_time)
            } else {
                SimulationOutcome::unsolved(used_time)
            });
        }
        used_time += step.budget;
    }
    Ok(SimulationOutcome::unsolved(best_seen.unwrap_or(used_time)))
}
