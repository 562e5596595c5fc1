use std::ops::Range;

use clap::Parser;
use std::{fs, path::PathBuf};

use anyhow::Result;
use log::info;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use sparkle_portfolio::data_table::{FeatureTable, PerformanceTable};

#[derive(Serialize, Deserialize, Debug, Clone)]
struct InstanceRangeConfig {
    mean: f64,
    std: f64,
    range: Range<usize>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct SolverConfig {
    name: String,
    instance_range_configs: Vec<InstanceRangeConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct DataGeneratorConfig {
    solver_configs: Vec<SolverConfig>,
    num_instances: usize,
    num_features: usize,
    /// Samples above this cutoff are kept as they are and count as timeouts.
    #[serde(default)]
    cutoff_time: Option<f64>,
    seed: u64,
    performance_out: PathBuf,
    feature_out: PathBuf,
}

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the json config
    #[arg(short, long)]
    pub config: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config: DataGeneratorConfig =
        serde_json::from_str(&fs::read_to_string(args.config)?)?;
    let (performance, features) = generate_data(&config)?;
    performance.save(&config.performance_out)?;
    features.save(&config.feature_out)?;
    info!(
        "Wrote {} instances to {} and {}",
        config.num_instances,
        config.performance_out.display(),
        config.feature_out.display()
    );
    Ok(())
}

fn instance_name(i: usize) -> String {
    format!("instance{i}")
}

/// Runtimes per solver and instance range, instances outside every range of
/// a solver stay pending.
fn generate_data(
    config: &DataGeneratorConfig,
) -> Result<(PerformanceTable, FeatureTable)> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    if let Some(cutoff) = config.cutoff_time {
        info!("Runtimes above {cutoff} are timeouts");
    }
    let mut performance = PerformanceTable::new();
    let mut features = FeatureTable::new();
    for i in 0..config.num_instances {
        performance.add_row(&instance_name(i))?;
        features.add_row(&instance_name(i))?;
    }
    for SolverConfig {
        name,
        instance_range_configs,
    } in &config.solver_configs
    {
        performance.add_column(name)?;
        for InstanceRangeConfig { mean, std, range } in instance_range_configs {
            let distrib = Normal::new(*mean, (*mean * *std).abs())?;
            for i in range.clone().filter(|&i| i < config.num_instances) {
                let runtime = distrib.sample(&mut rng).abs();
                performance.set(&instance_name(i), name, runtime)?;
            }
        }
    }
    let standard = Normal::new(0.0, 1.0)?;
    for k in 0..config.num_features {
        let feature = format!("feature{k}");
        features.add_column(&feature)?;
        for i in 0..config.num_instances {
            features.set(&instance_name(i), &feature, standard.sample(&mut rng))?;
        }
    }
    Ok((performance, features))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use sparkle_portfolio::{
        datastructures::{EvaluationConfig, Objective},
        performance::solver_penalty_ranking,
    };

    use crate::{
        generate_data, DataGeneratorConfig, InstanceRangeConfig, SolverConfig,
    };

    #[test]
    fn test_generate_data() {
        let config = DataGeneratorConfig {
            solver_configs: vec![
                SolverConfig {
                    name: "minisat".to_string(),
                    instance_range_configs: vec![
                        InstanceRangeConfig {
                            mean: 100.0,
                            std: 0.1,
                            range: (0..3),
                        },
                        InstanceRangeConfig {
                            mean: 50.0,
                            std: 0.1,
                            range: (3..5),
                        },
                    ],
                },
                SolverConfig {
                    name: "lingeling".to_string(),
                    instance_range_configs: vec![InstanceRangeConfig {
                        mean: 50.0,
                        std: 0.1,
                        range: (0..3),
                    }],
                },
            ],
            num_instances: 5,
            num_features: 3,
            cutoff_time: Some(60.0),
            seed: 42,
            performance_out: PathBuf::new(),
            feature_out: PathBuf::new(),
        };
        let (performance, features) = generate_data(&config).unwrap();
        assert_eq!(performance.row_count(), 5);
        assert_eq!(performance.list_columns(), ["minisat", "lingeling"]);
        assert_eq!(features.column_count(), 3);
        assert!(!features.has_missing_values());
        // lingeling has no range covering the last two instances
        assert_eq!(performance.get("instance4", "lingeling").unwrap(), None);
        // slow runs stay above the cutoff and are charged the penalty
        let slow = performance.get("instance0", "minisat").unwrap().unwrap();
        assert!(slow > 60.0, "{slow}");
        let evaluation = EvaluationConfig::new(Objective::Runtime, 60.0);
        let ranking = solver_penalty_ranking(&performance, &evaluation).unwrap();
        let (_, minisat) =
            ranking.iter().find(|(solver, _)| solver == "minisat").unwrap();
        assert!(*minisat >= 3.0 * 600.0 / 5.0, "{minisat}");
        let (again, _) = generate_data(&config).unwrap();
        assert_eq!(performance, again);
    }
}
