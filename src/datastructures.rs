use core::fmt;
use std::{fs, path::Path, str::FromStr};

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::error::{EvaluationError, Result};

/// Identifier of a solver (a performance table column).
pub type Solver = String;

/// Identifier of a problem instance (a table row).
pub type Instance = String;

/// What a performance value measures and in which direction it is optimised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    /// Wall-clock or CPU time, lower is better, capped by the cutoff.
    #[serde(rename = "RUNTIME")]
    Runtime,
    /// Solution quality, lower is better.
    #[serde(rename = "QUALITY_ABSOLUTE_MINIMISATION")]
    QualityMinimise,
    /// Solution quality, higher is better.
    #[serde(
        rename = "QUALITY_ABSOLUTE_MAXIMISATION",
        alias = "QUALITY_ABSOLUTE"
    )]
    QualityMaximise,
}

impl Objective {
    /// Whether smaller performance values are better.
    pub fn minimise(&self) -> bool {
        !matches!(self, Objective::QualityMaximise)
    }

    /// Whether runs are scored by time against the global cutoff.
    pub fn is_runtime(&self) -> bool {
        matches!(self, Objective::Runtime)
    }
}

impl FromStr for Objective {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RUNTIME" => Ok(Objective::Runtime),
            "QUALITY_ABSOLUTE_MINIMISATION" => Ok(Objective::QualityMinimise),
            "QUALITY_ABSOLUTE_MAXIMISATION" | "QUALITY_ABSOLUTE" => {
                Ok(Objective::QualityMaximise)
            }
            other => Err(EvaluationError::Configuration(format!(
                "unknown objective kind '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Objective::Runtime => "RUNTIME",
            Objective::QualityMinimise => "QUALITY_ABSOLUTE_MINIMISATION",
            Objective::QualityMaximise => "QUALITY_ABSOLUTE_MAXIMISATION",
        };
        write!(f, "{name}")
    }
}

/// How per-instance values are folded into one portfolio score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// PAR-style total.
    Sum,
    /// Arithmetic mean, 0 for no values.
    Mean,
}

impl Aggregation {
    /// Aggregate `values`.
    pub fn apply(&self, values: ArrayView1<f64>) -> f64 {
        match self {
            Aggregation::Sum => values.sum(),
            Aggregation::Mean => values.mean().unwrap_or(0.0),
        }
    }
}

impl FromStr for Aggregation {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregation::Sum),
            "mean" => Ok(Aggregation::Mean),
            other => Err(EvaluationError::Configuration(format!(
                "unknown aggregation function '{other}'"
            ))),
        }
    }
}

/// Rule turning a baseline and a leave-one-out score into a contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionFormula {
    /// Worsening factor `worse / better`, dimensionless.
    #[default]
    Ratio,
    /// Absolute loss `|baseline - reduced|`.
    Difference,
}

impl FromStr for ContributionFormula {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ratio" => Ok(ContributionFormula::Ratio),
            "difference" => Ok(ContributionFormula::Difference),
            other => Err(EvaluationError::Configuration(format!(
                "unknown contribution formula '{other}'"
            ))),
        }
    }
}

/// What to do when the selector for a leave-one-out branch cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchFailurePolicy {
    /// Score the branch with the penalised virtual best performance instead.
    #[default]
    VirtualBestProxy,
    /// Fail the whole computation.
    Abort,
}

/// How an existing contribution cache file is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Return the cached ranking, only warn when its fingerprint is stale.
    #[default]
    TrustExisting,
    /// Recompute when the stored fingerprint differs from the input data.
    CheckFingerprint,
}

/// The two selectors a solver's marginal contribution is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    /// Oracle that always picks the best solver.
    Perfect,
    /// The trained selector replayed over known performance data.
    Actual,
}

impl SelectorKind {
    /// Short name used for cache file names.
    pub fn file_stem(&self) -> &'static str {
        match self {
            SelectorKind::Perfect => "perfect",
            SelectorKind::Actual => "actual",
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorKind::Perfect => write!(f, "perfect selector"),
            SelectorKind::Actual => write!(f, "actual selector"),
        }
    }
}

/// Settings consumed by every scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// What performance values measure.
    #[serde(default = "default_objective")]
    pub objective: Objective,
    /// Seconds a schedule may spend on one instance.
    #[serde(default = "default_cutoff_time")]
    pub cutoff_time: f64,
    /// Unsolved runs are charged `cutoff_time * penalty_multiplier`.
    #[serde(default = "default_penalty_multiplier")]
    pub penalty_multiplier: f64,
    /// Falls back to sum for runtime and mean for quality objectives.
    #[serde(default)]
    pub aggregation: Option<Aggregation>,
    /// Ignore existing contribution caches.
    #[serde(default)]
    pub force_recompute: bool,
    /// How the perfect and actual contributions are derived.
    #[serde(default)]
    pub formula: ContributionFormula,
    /// Handling of leave-one-out selectors that cannot be built.
    #[serde(default)]
    pub branch_failure_policy: BranchFailurePolicy,
    /// Handling of caches computed from different input data.
    #[serde(default)]
    pub cache_policy: CachePolicy,
}

fn default_objective() -> Objective {
    Objective::Runtime
}

fn default_cutoff_time() -> f64 {
    60.0
}

fn default_penalty_multiplier() -> f64 {
    10.0
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig::new(default_objective(), default_cutoff_time())
    }
}

impl EvaluationConfig {
    /// Configuration with default penalty, aggregation and policies.
    pub fn new(objective: Objective, cutoff_time: f64) -> Self {
        Self {
            objective,
            cutoff_time,
            penalty_multiplier: default_penalty_multiplier(),
            aggregation: None,
            force_recompute: false,
            formula: ContributionFormula::default(),
            branch_failure_policy: BranchFailurePolicy::default(),
            cache_policy: CachePolicy::default(),
        }
    }

    /// Read a json configuration file and validate it.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)?;
        let config: EvaluationConfig = serde_json::from_str(&config_str)
            .map_err(|e| {
                EvaluationError::Configuration(format!(
                    "{}: {e}",
                    path.display()
                ))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject cutoffs and multipliers no score can be computed with.
    pub fn validate(&self) -> Result<()> {
        if !self.cutoff_time.is_finite() || self.cutoff_time <= 0.0 {
            return Err(EvaluationError::Configuration(format!(
                "cutoff time must be positive, got {}",
                self.cutoff_time
            )));
        }
        if !self.penalty_multiplier.is_finite() || self.penalty_multiplier < 1.0
        {
            return Err(EvaluationError::Configuration(format!(
                "penalty multiplier must be at least 1, got {}",
                self.penalty_multiplier
            )));
        }
        Ok(())
    }

    /// Whether smaller performance values are better.
    pub fn minimise(&self) -> bool {
        self.objective.minimise()
    }

    /// The configured aggregation or the objective's default.
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation.unwrap_or(if self.objective.is_runtime() {
            Aggregation::Sum
        } else {
            Aggregation::Mean
        })
    }

    /// Time charged for an unsuccessful run.
    pub fn penalised_time(&self) -> f64 {
        self.cutoff_time * self.penalty_multiplier
    }
}

impl fmt::Display for EvaluationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "objective: {}", self.objective)?;
        writeln!(f, "cutoff time: {}", self.cutoff_time)?;
        writeln!(f, "penalty multiplier: {}", self.penalty_multiplier)?;
        writeln!(f, "aggregation: {:?}", self.aggregation())?;
        write!(f, "contribution formula: {:?}", self.formula)
    }
}

/// One entry of a predicted schedule: run `solver` for at most `budget`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStep {
    /// Solver to run.
    pub solver: Solver,
    /// Time slice in seconds, for quality objectives informational only.
    pub budget: f64,
}

impl ScheduleStep {
    /// Run `solver` for at most `budget`.
    pub fn new(solver: impl Into<Solver>, budget: f64) -> Self {
        Self {
            solver: solver.into(),
            budget,
        }
    }
}

impl fmt::Display for ScheduleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.solver, self.budget)
    }
}

/// Ordered solver schedule for a single instance.
pub type Schedule = Vec<ScheduleStep>;

/// Result of replaying a schedule on one instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationOutcome {
    /// Time used or quality reached, see [`crate::schedule_simulator::simulate`].
    pub performance: f64,
    /// Whether the instance was solved within the cutoff or beat its cap.
    pub solved: bool,
}

impl SimulationOutcome {
    /// A solved instance.
    pub fn solved(performance: f64) -> Self {
        Self {
            performance,
            solved: true,
        }
    }

    /// An unsolved instance.
    pub fn unsolved(performance: f64) -> Self {
        Self {
            performance,
            solved: false,
        }
    }
}

/// A solver's marginal contribution to one selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginalContribution {
    /// The solver left out.
    pub solver: Solver,
    /// Zero for redundant solvers, otherwise by [`ContributionFormula`].
    pub value: f64,
    /// Removing the solver improved the selector.
    pub dubious: bool,
}

impl MarginalContribution {
    /// A contribution that is not dubious.
    pub fn new(solver: impl Into<Solver>, value: f64) -> Self {
        Self {
            solver: solver.into(),
            value,
            dubious: false,
        }
    }
}

/// Solvers ranked by descending marginal contribution.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionRanking {
    /// Selector the contributions refer to.
    pub kind: SelectorKind,
    /// One record per solver, best first.
    pub records: Vec<MarginalContribution>,
    /// Loaded from the cache file rather than computed.
    pub from_cache: bool,
}

impl ContributionRanking {
    /// Solver names in rank order.
    pub fn solvers(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.solver.as_str()).collect()
    }

    /// Contribution of `solver`, if it is part of the ranking.
    pub fn value_of(&self, solver: &str) -> Option<f64> {
        self.records
            .iter()
            .find(|r| r.solver == solver)
            .map(|r| r.value)
    }
}

impl fmt::Display for ContributionRanking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "******")?;
        writeln!(
            f,
            "Solver ranking list via marginal contribution (Margi_Contr) with regards to {}",
            self.kind
        )?;
        for (rank, record) in self.records.iter().enumerate() {
            write!(
                f,
                "#{}: {}\t Margi_Contr: {}",
                rank + 1,
                record.solver,
                record.value
            )?;
            if record.dubious {
                write!(f, " (dubious)")?;
            }
            writeln!(f)?;
        }
        write!(f, "******")
    }
}
