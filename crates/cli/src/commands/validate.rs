//! Configuration validation CLI command.

use anyhow::Result;
use clap::Args;

use flowcast_core::config_loader::DEFAULT_CONFIG_PATH;
use flowcast_core::{ConfigLoader, ForecastProblem};

/// Arguments for the validate command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
}

/// Loads and validates the configuration, then prints a short description.
///
/// # Errors
/// Returns an error if the configuration cannot be loaded or is invalid.
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    let problem = ConfigLoader::load_from(&args.config)?;
    println!("{}", describe(&problem));
    Ok(())
}

fn describe(problem: &ForecastProblem) -> String {
    let forced = problem.predictors.iter().filter(|p| p.forced).count();
    let mut output = format!(
        "Predictand: {} ({:?})\nPredictors: {} ({} forced)\nTraining: {}-{}",
        problem.predictand.name,
        problem.predictand.preprocessing,
        problem.predictors.len(),
        forced,
        problem.training.start_year,
        problem.training.end_year,
    );
    if !problem.training.excluded_years.is_empty() {
        output.push_str(&format!(" excluding {:?}", problem.training.excluded_years));
    }
    for spec in &problem.regressors {
        output.push_str(&format!(
            "\nRegressor: {} / {} / {:?} / {:?}",
            spec.regression.label(),
            spec.cross_validation.label(),
            spec.feature_selection,
            spec.scoring
        ));
    }
    output
}
