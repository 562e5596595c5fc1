#![warn(missing_docs)]
//! Evaluate algorithm portfolios by the marginal contribution of their solvers.
//!
//! Given a performance table (instances x solvers) and a feature table
//! (instances x features), the library measures how much every solver adds to
//! the *perfect* selector (the virtual best solver) and to the *actual*
//! selector (a trained per-instance selector such as AutoFolio, replayed over
//! the recorded performance data). Both are leave-one-out computations: a
//! solver's contribution compares the score with and without its column.
//!
//! The selector itself is an external collaborator behind the
//! [`selector::SelectorBuilder`] and [`selector::SchedulePredictor`] traits;
//! [`selector::AutoFolio`] drives the AutoFolio command line.
//!
//! This project also contains the `sparkle_portfolio` executable that prints
//! both rankings for csv input, and a generator for synthetic input data.
//!
//! Example
//! ```no_run
//! use sparkle_portfolio::data_table::{FeatureTable, PerformanceTable};
//! use sparkle_portfolio::datastructures::{EvaluationConfig, Objective};
//! use sparkle_portfolio::marginal_contribution::MarginalContributionEngine;
//! use sparkle_portfolio::selector::AutoFolio;
//! # use std::path::PathBuf;
//! # use anyhow::Result;
//!
//! fn example() -> Result<()> {
//!     // header row = solvers, first column = instances, blank cell = pending
//!     let performance =
//!         PerformanceTable::load(&PathBuf::from("performance_data.csv"))?;
//!     let features = FeatureTable::load(&PathBuf::from("feature_data.csv"))?;
//!     let config = EvaluationConfig::new(Objective::Runtime, 60.0);
//!     let mut autofolio = AutoFolio::new("python3", "AutoFolio/scripts/autofolio");
//!
//!     let mut engine =
//!         MarginalContributionEngine::new(&config, &mut autofolio, "output");
//!     let perfect = engine.compute_perfect(&performance)?;
//!     let actual = engine.compute_actual(&performance, &features)?;
//!     // rankings are cached in output/marginal_contribution_{perfect,actual}.csv
//!     println!("{perfect}\n{actual}");
//!     Ok(())
//! }
//! ```

/// Scores of a trained selector replayed over known performance data.
pub mod actual_selector;

/// An instance x column table of optional numbers with csv persistence.
pub mod data_table;

/// Configuration and value types shared by all scoring steps.
pub mod datastructures;

/// Error taxonomy of the library.
pub mod error;

/// Feature vectors and imputation of missing feature values.
pub mod features;

/// Leave-one-out marginal contribution with cached rankings.
pub mod marginal_contribution;

/// Cap values, penalties and other views on performance data.
pub mod performance;

/// Interface to selector construction and schedule prediction.
pub mod selector;

/// Replays a predicted schedule on recorded performance data.
pub mod schedule_simulator;

/// The virtual best solver, i.e. the perfect selector.
pub mod virtual_best;

#[cfg(test)]
mod test_utils;
