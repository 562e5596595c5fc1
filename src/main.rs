use anyhow::{anyhow, Result};
use clap::Parser;
use log::{error, info, warn};
use std::fs;

use sparkle_portfolio::data_table::{FeatureTable, PerformanceTable};
use sparkle_portfolio::datastructures::{Aggregation, EvaluationConfig};
use sparkle_portfolio::error::EvaluationError;
use sparkle_portfolio::marginal_contribution::MarginalContributionEngine;
use sparkle_portfolio::performance::{
    pending_jobs, solver_penalty_ranking, CapValues,
};
use sparkle_portfolio::selector::AutoFolio;
use sparkle_portfolio::virtual_best;

mod cli;
use cli::{Args, Config};

fn main() {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbosity.log_level_filter())
        .init();
    let config = match Config::from_cli(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    if let Err(e) = run(&args, &config) {
        error!("{e:#}");
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(e: &anyhow::Error) -> exitcode::ExitCode {
    match e.downcast_ref::<EvaluationError>() {
        Some(EvaluationError::DataIntegrity(_))
        | Some(EvaluationError::ScheduleParse(_))
        | Some(EvaluationError::Polars(_)) => exitcode::DATAERR,
        Some(EvaluationError::Configuration(_)) => exitcode::CONFIG,
        Some(EvaluationError::ExternalTool { .. }) => exitcode::UNAVAILABLE,
        Some(EvaluationError::Io(_)) => exitcode::IOERR,
        _ => exitcode::SOFTWARE,
    }
}

fn run(args: &Args, config: &Config) -> Result<()> {
    let evaluation = &config.evaluation;
    info!("Evaluating with\n{evaluation}");
    fs::create_dir_all(&config.output_dir)?;
    let performance = PerformanceTable::load(&config.performance_data)?;
    let pending = pending_jobs(&performance);
    if !pending.is_empty() {
        warn!(
            "{} runs are still pending, they are treated as unsolved",
            pending.len()
        );
    }
    if evaluation.objective.is_runtime() {
        println!("******");
        println!("Solver ranking list via penalised average runtime:");
        for (rank, (solver, par)) in solver_penalty_ranking(&performance, evaluation)?
            .iter()
            .enumerate()
        {
            println!("#{}: {solver}\t PAR{}: {par}", rank + 1, evaluation.penalty_multiplier);
        }
        let par_config = EvaluationConfig {
            aggregation: Some(Aggregation::Mean),
            ..evaluation.clone()
        };
        let caps = CapValues::resolve(&performance, &par_config)?;
        let vbs = virtual_best::penalised_score(&performance, &par_config, &caps)?;
        println!("Virtual best solver PAR{}: {vbs}", evaluation.penalty_multiplier);
        println!("******");
    }

    let mut autofolio = AutoFolio::new(
        &config.python,
        config.autofolio.clone().unwrap_or_default(),
    );
    let mut engine =
        MarginalContributionEngine::new(evaluation, &mut autofolio, &config.output_dir);
    if !args.actual {
        println!("{}", engine.compute_perfect(&performance)?);
    }
    if !args.perfect {
        if config.autofolio.is_none() {
            return Err(EvaluationError::Configuration(
                "the actual selector needs the path to AutoFolio".to_string(),
            )
            .into());
        }
        let feature_path = config.feature_data.as_ref().ok_or_else(|| {
            anyhow!(EvaluationError::Configuration(
                "the actual selector needs feature data".to_string()
            ))
        })?;
        let features = FeatureTable::load(feature_path)?;
        println!("{}", engine.compute_actual(&performance, &features)?);
    }
    Ok(())
}
