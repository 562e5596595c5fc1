use std::path::{Path, PathBuf};

use log::{info, warn};
use ndarray::Array1;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::{
    actual_selector,
    data_table::{FeatureTable, PerformanceTable},
    datastructures::*,
    error::{EvaluationError, Result},
    performance::{penalised_value, CapValues},
    selector::SelectorOracle,
    virtual_best,
};

mod cache;

/// Name of the artifact every selector is stored as.
const SELECTOR_FILE: &str = "portfolio_selector";

/// Turn a baseline and a leave-one-out score into a contribution.
///
/// Returns the contribution and whether removing the solver *improved* the
/// score, which is reported as dubious with a contribution of zero.
/// Unchanged scores contribute zero.
pub fn marginal_contribution(
    baseline: f64,
    reduced: f64,
    higher_is_better: bool,
    formula: ContributionFormula,
) -> (f64, bool) {
    let scale = baseline.abs().max(reduced.abs());
    if (baseline - reduced).abs() <= 1e-12 * scale {
        return (0.0, false);
    }
    let worse = if higher_is_better {
        reduced < baseline
    } else {
        reduced > baseline
    };
    if !worse {
        return (0.0, true);
    }
    let value = match formula {
        ContributionFormula::Difference => (baseline - reduced).abs(),
        ContributionFormula::Ratio => {
            let (worse, better) = if higher_is_better {
                (baseline, reduced)
            } else {
                (reduced, baseline)
            };
            if better <= 0.0 {
                f64::INFINITY
            } else {
                worse / better
            }
        }
    };
    (value, false)
}

/// Identifies the inputs a ranking was computed from.
///
/// Covers the tables and every setting that changes a score, not the cache
/// and recompute switches.
pub fn fingerprint(
    kind: SelectorKind,
    performance: &PerformanceTable,
    features: Option<&FeatureTable>,
    config: &EvaluationConfig,
) -> String {
    let settings = json!({
        "kind": kind,
        "objective": config.objective,
        "cutoff_time": config.cutoff_time,
        "penalty_multiplier": config.penalty_multiplier,
        "aggregation": config.aggregation(),
        "formula": config.formula,
        "branch_failure_policy": config.branch_failure_policy,
    });
    let mut hasher = Sha256::new();
    hasher.update(settings.to_string().as_bytes());
    hasher.update(performance.fingerprint().as_bytes());
    if let Some(features) = features {
        hasher.update(features.fingerprint().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Sort by descending contribution, ties keep column order.
fn rank(mut records: Vec<MarginalContribution>) -> Vec<MarginalContribution> {
    records.sort_by(|a, b| b.value.total_cmp(&a.value));
    records
}

/// Leave-one-out marginal contribution of every solver to the perfect and the
/// actual selector, cached per selector kind below `output_dir`.
///
/// Branches run one after another, each on its own copy of the table, and
/// selectors are built through `oracle` one at a time. Callers running
/// several engines on the same `output_dir` have to serialise them.
pub struct MarginalContributionEngine<'a, O: SelectorOracle + ?Sized> {
    config: &'a EvaluationConfig,
    oracle: &'a mut O,
    output_dir: PathBuf,
}

impl<'a, O: SelectorOracle + ?Sized> MarginalContributionEngine<'a, O> {
    /// Engine writing caches and selectors below `output_dir`.
    pub fn new(
        config: &'a EvaluationConfig,
        oracle: &'a mut O,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            oracle,
            output_dir: output_dir.into(),
        }
    }

    /// `marginal_contribution_<kind>.csv` in the output directory.
    pub fn cache_path(&self, kind: SelectorKind) -> PathBuf {
        self.output_dir
            .join(format!("marginal_contribution_{}.csv", kind.file_stem()))
    }

    /// Where the selector of the full portfolio, or of the portfolio without
    /// `without`, is stored.
    pub fn selector_path(&self, without: Option<&str>) -> PathBuf {
        let dir = self.output_dir.join(SELECTOR_FILE);
        let dir = match without {
            Some(solver) => dir.join(format!("without_{solver}")),
            None => dir,
        };
        dir.join(SELECTOR_FILE)
    }

    /// Marginal contribution of each solver to the virtual best solver.
    pub fn compute_perfect(
        &mut self,
        performance: &PerformanceTable,
    ) -> Result<ContributionRanking> {
        let kind = SelectorKind::Perfect;
        let fingerprint = fingerprint(kind, performance, None, self.config);
        if let Some(ranking) = self.cached(kind, &fingerprint)? {
            return Ok(ranking);
        }
        info!("Computing marginal contribution with respect to the {kind} ...");
        let config = self.config;
        let aggregation = config.aggregation();
        let caps = CapValues::resolve(performance, config)?;
        let baseline = virtual_best::score(
            performance,
            aggregation,
            config.minimise(),
            &caps,
        )?;
        info!("Virtual best performance for portfolio selector with all solvers is {baseline}");

        let mut records = Vec::with_capacity(performance.column_count());
        for solver in performance.list_columns() {
            let reduced_table = performance.without_column(solver)?;
            // an empty portfolio has no benefit
            let reduced = if reduced_table.column_count() == 0 {
                Ok(0.0)
            } else {
                CapValues::resolve_reduced(&reduced_table, config, &caps)
                    .and_then(|caps| {
                        virtual_best::score(
                            &reduced_table,
                            aggregation,
                            config.minimise(),
                            &caps,
                        )
                    })
            }
            .map_err(|e| e.context(format!("without solver '{solver}'")))?;
            info!("Virtual best performance for portfolio selector excluding solver {solver} is {reduced}");
            records.push(self.record(solver, baseline, reduced, true));
        }
        self.finish(kind, records, &fingerprint)
    }

    /// Marginal contribution of each solver to the trained selector.
    ///
    /// The full-portfolio selector must build, otherwise the computation
    /// fails. A leave-one-out selector that does not build is handled by the
    /// configured [`BranchFailurePolicy`].
    pub fn compute_actual(
        &mut self,
        performance: &PerformanceTable,
        features: &FeatureTable,
    ) -> Result<ContributionRanking> {
        let kind = SelectorKind::Actual;
        let fingerprint =
            fingerprint(kind, performance, Some(features), self.config);
        if let Some(ranking) = self.cached(kind, &fingerprint)? {
            return Ok(ranking);
        }
        info!("Computing marginal contribution with respect to the {kind} ...");
        info!("Using cutoff time {}", self.config.cutoff_time);
        let caps = CapValues::resolve(performance, self.config)?;
        let selector = self.selector_path(None);
        self.build_selector(performance, features, &selector)
            .map_err(|e| e.context("baseline selector with all solvers"))?;
        let baseline = actual_selector::score(
            self.oracle,
            &selector,
            performance,
            features,
            self.config,
            &caps,
        )?;
        info!("Actual performance for portfolio selector with all solvers is {baseline}");

        let higher_is_better = !self.config.minimise();
        let mut records = Vec::with_capacity(performance.column_count());
        for solver in performance.list_columns() {
            let reduced_table = performance.without_column(solver)?;
            let reduced = match self.branch_score(solver, &reduced_table, features, &caps)
            {
                Ok(score) => score,
                Err(e)
                    if e.is_external()
                        && self.config.branch_failure_policy
                            == BranchFailurePolicy::VirtualBestProxy =>
                {
                    warn!("{e}; using the virtual best performance without {solver} instead");
                    let caps =
                        CapValues::resolve_reduced(&reduced_table, self.config, &caps)?;
                    virtual_best::penalised_score(&reduced_table, self.config, &caps)?
                }
                Err(e) => {
                    return Err(e.context(format!("without solver '{solver}'")))
                }
            };
            info!("Actual performance for portfolio selector excluding solver {solver} is {reduced}");
            records.push(self.record(solver, baseline, reduced, higher_is_better));
        }
        self.finish(kind, records, &fingerprint)
    }

    fn build_selector(
        &mut self,
        performance: &PerformanceTable,
        features: &FeatureTable,
        output: &Path,
    ) -> Result<()> {
        let built = self.oracle.construct_selector(
            performance,
            features,
            output,
            self.config,
        )?;
        if built && output.is_file() {
            Ok(())
        } else {
            Err(EvaluationError::external(
                "selector",
                format!("no selector was constructed at {}", output.display()),
            ))
        }
    }

    fn branch_score(
        &mut self,
        solver: &str,
        reduced_table: &PerformanceTable,
        features: &FeatureTable,
        full_caps: &CapValues,
    ) -> Result<f64> {
        if reduced_table.column_count() == 0 {
            // nothing left to select from, every instance is unsolved
            let penalties = (0..reduced_table.row_count())
                .map(|i| Ok(penalised_value(self.config, full_caps.get(i)?)))
                .collect::<Result<Vec<f64>>>()?;
            return Ok(self
                .config
                .aggregation()
                .apply(Array1::from_vec(penalties).view()));
        }
        let caps = CapValues::resolve_reduced(reduced_table, self.config, full_caps)?;
        let selector = self.selector_path(Some(solver));
        self.build_selector(reduced_table, features, &selector)?;
        actual_selector::score(
            self.oracle,
            &selector,
            reduced_table,
            features,
            self.config,
            &caps,
        )
    }

    fn record(
        &self,
        solver: &str,
        baseline: f64,
        reduced: f64,
        higher_is_better: bool,
    ) -> MarginalContribution {
        let (value, dubious) = marginal_contribution(
            baseline,
            reduced,
            higher_is_better,
            self.config.formula,
        );
        if dubious {
            warn!(
                "The selector performs better without solver {solver} ({reduced} vs. {baseline}), the selector may be of low quality"
            );
        }
        MarginalContribution {
            solver: solver.to_string(),
            value,
            dubious,
        }
    }

    fn cached(
        &self,
        kind: SelectorKind,
        fingerprint: &str,
    ) -> Result<Option<ContributionRanking>> {
        if self.config.force_recompute {
            info!("Recomputing the marginal contribution of the {kind}");
            return Ok(None);
        }
        let path = self.cache_path(kind);
        let cached = match cache::load(&path) {
            Ok(Some(cached)) => cached,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("Ignoring unreadable cache {}: {e}", path.display());
                return Ok(None);
            }
        };
        let fresh = cached
            .meta
            .as_ref()
            .map_or(false, |meta| meta.fingerprint == fingerprint);
        if !fresh {
            match self.config.cache_policy {
                CachePolicy::TrustExisting => warn!(
                    "Cached marginal contribution {} may be stale, the input data changed since it was computed",
                    path.display()
                ),
                CachePolicy::CheckFingerprint => {
                    info!("Cached marginal contribution {} is stale, recomputing", path.display());
                    return Ok(None);
                }
            }
        }
        info!("Marginal contribution of the {kind} loaded from {}", path.display());
        Ok(Some(ContributionRanking {
            kind,
            records: cached.records,
            from_cache: true,
        }))
    }

    fn finish(
        &self,
        kind: SelectorKind,
        records: Vec<MarginalContribution>,
        fingerprint: &str,
    ) -> Result<ContributionRanking> {
        let records = rank(records);
        let path = self.cache_path(kind);
        cache::store(&path, &records, fingerprint)?;
        info!("Marginal contribution of the {kind} written to {}", path.display());
        Ok(ContributionRanking {
            kind,
            records,
            from_cache: false,
        })
    }
}
