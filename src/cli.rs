use anyhow::{bail, Result};
use clap::Parser;
use clap_verbosity_flag::Verbosity;
use serde::{Deserialize, Serialize};
use sparkle_portfolio::datastructures::EvaluationConfig;
use std::{fs, path::PathBuf};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default)]
    pub performance_data: PathBuf,
    #[serde(default)]
    pub feature_data: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_python")]
    pub python: PathBuf,
    #[serde(default)]
    pub autofolio: Option<PathBuf>,
    #[serde(flatten)]
    pub evaluation: EvaluationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            performance_data: PathBuf::new(),
            feature_data: None,
            output_dir: default_output_dir(),
            python: default_python(),
            autofolio: None,
            evaluation: EvaluationConfig::default(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("Output")
}

fn default_python() -> PathBuf {
    PathBuf::from("python3")
}

impl Config {
    pub fn from_cli(args: &Args) -> Result<Config> {
        let mut config: Config = match &args.config {
            Some(config_path) => {
                let config_str = fs::read_to_string(config_path)?;
                serde_json::from_str(&config_str)?
            }
            None => Config::default(),
        };
        if let Some(performance_data) = &args.performance_data {
            config.performance_data = performance_data.to_path_buf();
        }
        if let Some(feature_data) = &args.feature_data {
            config.feature_data = Some(feature_data.to_path_buf());
        }
        if let Some(output_dir) = &args.output_dir {
            config.output_dir = output_dir.to_path_buf();
        }
        if let Some(python) = &args.python {
            config.python = python.to_path_buf();
        }
        if let Some(autofolio) = &args.autofolio {
            config.autofolio = Some(autofolio.to_path_buf());
        }
        let evaluation = &mut config.evaluation;
        if let Some(objective) = &args.objective {
            evaluation.objective = objective.parse()?;
        }
        if let Some(cutoff_time) = args.cutoff_time {
            evaluation.cutoff_time = cutoff_time;
        }
        if let Some(penalty_multiplier) = args.penalty_multiplier {
            evaluation.penalty_multiplier = penalty_multiplier;
        }
        if let Some(aggregation) = &args.aggregation {
            evaluation.aggregation = Some(aggregation.parse()?);
        }
        if let Some(formula) = &args.formula {
            evaluation.formula = formula.parse()?;
        }
        if args.recompute {
            evaluation.force_recompute = true;
        }
        evaluation.validate()?;
        if config.performance_data.as_os_str().is_empty() {
            bail!("no performance data given");
        }
        Ok(config)
    }
}

#[derive(Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Path to the json config
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// CSV file with one row per instance and one column per solver
    #[arg(short, long, value_name = "FILE")]
    pub performance_data: Option<PathBuf>,
    /// CSV file with one row per instance and one column per feature
    #[arg(short, long, value_name = "FILE")]
    pub feature_data: Option<PathBuf>,
    /// Directory for selectors and cached rankings
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// RUNTIME, QUALITY_ABSOLUTE_MINIMISATION or QUALITY_ABSOLUTE_MAXIMISATION
    #[arg(long)]
    pub objective: Option<String>,
    /// Cutoff time per instance in seconds
    #[arg(short = 't', long)]
    pub cutoff_time: Option<f64>,
    /// Unsolved runs are charged cutoff time times this multiplier
    #[arg(long)]
    pub penalty_multiplier: Option<f64>,
    /// sum or mean
    #[arg(short, long)]
    pub aggregation: Option<String>,
    /// ratio or difference
    #[arg(long)]
    pub formula: Option<String>,
    /// Python interpreter used to run AutoFolio
    #[arg(long, value_name = "FILE")]
    pub python: Option<PathBuf>,
    /// Path to the AutoFolio script
    #[arg(long, value_name = "FILE")]
    pub autofolio: Option<PathBuf>,
    /// Only compute the contribution to the perfect selector
    #[arg(long, conflicts_with = "actual")]
    pub perfect: bool,
    /// Only compute the contribution to the actual selector
    #[arg(long)]
    pub actual: bool,
    /// Ignore cached rankings
    #[arg(short, long)]
    pub recompute: bool,
    #[command(flatten)]
    pub verbosity: Verbosity,
}
