use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use log::{debug, info, warn};

use super::{parse_schedule_response, SchedulePredictor, SelectorBuilder};
use crate::{
    data_table::{FeatureTable, PerformanceTable},
    datastructures::*,
    error::{EvaluationError, Result},
    features::{feature_vector_string, impute_missing_values},
};

/// AutoFolio refuses cutoff times below this many seconds.
const MINIMUM_CUTOFF_TIME: f64 = 2.0;

const TOOL: &str = "autofolio";

/// Selector construction and prediction through the AutoFolio command line.
#[derive(Debug, Clone)]
pub struct AutoFolio {
    python: PathBuf,
    script: PathBuf,
}

impl AutoFolio {
    /// Run `script` with the `python` interpreter.
    pub fn new(python: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            script: script.into(),
        }
    }

    fn run(&self, args: &[&OsStr]) -> Result<Output> {
        debug!(
            "Running {} {} {:?}",
            self.python.display(),
            self.script.display(),
            args
        );
        Command::new(&self.python)
            .arg(&self.script)
            .args(args)
            .output()
            .map_err(|e| {
                EvaluationError::external(
                    TOOL,
                    format!("could not start {}: {e}", self.python.display()),
                )
            })
    }
}

fn objective_argument(objective: Objective) -> &'static str {
    match objective {
        Objective::Runtime => "runtime",
        Objective::QualityMinimise | Objective::QualityMaximise => {
            "solution_quality"
        }
    }
}

impl SelectorBuilder for AutoFolio {
    fn construct_selector(
        &mut self,
        performance: &PerformanceTable,
        features: &FeatureTable,
        output: &Path,
        config: &EvaluationConfig,
    ) -> Result<bool> {
        let work_dir = output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&work_dir)?;
        if output.exists() {
            fs::remove_file(output)?;
        }
        let cutoff_time = if config.cutoff_time < MINIMUM_CUTOFF_TIME {
            warn!(
                "A cutoff time of {} is too small for AutoFolio, setting it to {MINIMUM_CUTOFF_TIME}",
                config.cutoff_time
            );
            MINIMUM_CUTOFF_TIME
        } else {
            config.cutoff_time
        };
        let performance_path = work_dir.join("performance_data.csv");
        let feature_path = work_dir.join("feature_data.csv");
        performance.save(&performance_path)?;
        impute_missing_values(features)?.save(&feature_path)?;

        let cutoff_arg = cutoff_time.to_string();
        let result = self.run(&[
            OsStr::new("--performance_csv"),
            performance_path.as_os_str(),
            OsStr::new("--feature_csv"),
            feature_path.as_os_str(),
            OsStr::new("--objective"),
            OsStr::new(objective_argument(config.objective)),
            OsStr::new("--runtime_cutoff"),
            OsStr::new(&cutoff_arg),
            OsStr::new("--tune"),
            OsStr::new("--save"),
            output.as_os_str(),
        ])?;
        fs::write(work_dir.join("autofolio.out"), &result.stdout)?;
        fs::write(work_dir.join("autofolio.err"), &result.stderr)?;
        for path in [&performance_path, &feature_path] {
            if let Err(e) = fs::remove_file(path) {
                debug!("Could not remove {}: {e}", path.display());
            }
        }

        if !result.status.success() || !output.is_file() {
            warn!(
                "Portfolio selector {} was not constructed, see {} for details",
                output.display(),
                work_dir.join("autofolio.err").display()
            );
            return Ok(false);
        }
        info!("Portfolio selector constructed at {}", output.display());
        Ok(true)
    }
}

impl SchedulePredictor for AutoFolio {
    fn predict_schedule(
        &mut self,
        selector: &Path,
        feature_vector: &[f64],
    ) -> Result<Schedule> {
        let vector = feature_vector_string(feature_vector);
        let result = self.run(&[
            OsStr::new("--load"),
            selector.as_os_str(),
            OsStr::new("--feature_vec"),
            OsStr::new(&vector),
        ])?;
        if !result.status.success() {
            return Err(EvaluationError::external(
                TOOL,
                format!(
                    "prediction with {} exited with {}: {}",
                    selector.display(),
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            ));
        }
        parse_schedule_response(&String::from_utf8_lossy(&result.stdout))
    }
}
