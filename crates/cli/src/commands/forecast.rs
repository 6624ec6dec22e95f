//! Forecast calibration CLI command.
//!
//! Fits a chosen predictor set with bootstrap calibration for each requested
//! year and prints the 10/30/50/70/90 exceedance values.

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use serde::Serialize;

use flowcast_calibration::{
    CalibrationReport, ForecastCalibrator, ForecastDistribution, ForecastModel,
};
use flowcast_core::config_loader::DEFAULT_CONFIG_PATH;
use flowcast_core::{CancellationFlag, ConfigLoader, CrossValidationKind, RegressionKind};

use crate::dataset::load_dataset;

/// Arguments for the forecast command.
#[derive(Args, Debug, Clone)]
pub struct ForecastArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Dataset CSV (first column `year`, one column per series)
    #[arg(short, long)]
    pub data: String,

    /// Comma-separated predictor names
    #[arg(short, long)]
    pub predictors: String,

    /// Regression family: ols, pcr, zscore
    #[arg(short, long, default_value = "ols")]
    pub regression: String,

    /// Years to forecast, e.g. "2020,2022-2024"
    #[arg(short, long)]
    pub years: String,

    /// Write the distribution to this JSON file
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Serialize)]
struct ForecastOutput<'a> {
    model: &'a ForecastModel,
    distribution: &'a ForecastDistribution,
}

/// Parses a regression family name.
pub fn parse_regression(s: &str) -> Result<RegressionKind> {
    match s.to_lowercase().as_str() {
        "ols" => Ok(RegressionKind::Ols),
        "pcr" => Ok(RegressionKind::Pcr),
        "zscore" | "z_score" | "z-score" => Ok(RegressionKind::ZScore),
        _ => Err(anyhow!(
            "Unknown regression: '{}'. Valid values: ols, pcr, zscore",
            s
        )),
    }
}

/// Parses a year list such as `"2020,2022-2024"` into ascending, distinct
/// years.
pub fn parse_years(s: &str) -> Result<Vec<i32>> {
    let mut years = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let bound = |text: &str| -> Result<i32> {
                    text.trim()
                        .parse()
                        .with_context(|| format!("Invalid year range '{part}'"))
                };
                let (start, end) = (bound(start)?, bound(end)?);
                if start > end {
                    bail!("Year range '{part}' is reversed");
                }
                years.extend(start..=end);
            }
            None => years.push(part.parse().with_context(|| format!("Invalid year '{part}'"))?),
        }
    }
    if years.is_empty() {
        bail!("No years given");
    }
    years.sort_unstable();
    years.dedup();
    Ok(years)
}

/// Runs the forecast command.
///
/// # Errors
/// Returns an error if arguments, configuration or data are invalid, the
/// run is cancelled, or the output file cannot be written.
pub async fn run_forecast(args: ForecastArgs) -> Result<()> {
    let problem = ConfigLoader::load_from(&args.config)?;
    let dataset = load_dataset(&args.data)?;
    let years = parse_years(&args.years)?;
    let regression = parse_regression(&args.regression)?;

    let predictors: Vec<String> = args
        .predictors
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if predictors.is_empty() {
        bail!("At least one predictor is required");
    }

    let cross_validation = problem
        .regressors
        .iter()
        .find(|spec| spec.regression == regression)
        .map_or(CrossValidationKind::LeaveOneOut, |spec| spec.cross_validation);
    let model = ForecastModel::new(predictors, regression, cross_validation);

    let cancel = CancellationFlag::new();
    super::cancel_on_ctrl_c(&cancel);

    let task_model = model.clone();
    let (distribution, report) = tokio::task::spawn_blocking(move || {
        let mut distribution = ForecastDistribution::new();
        let report = ForecastCalibrator::new(&problem, &dataset)
            .with_cancellation(cancel)
            .calibrate_years(&task_model, &years, &mut distribution);
        (distribution, report)
    })
    .await
    .context("Forecast task failed")?;

    println!("{}", format_distribution(&distribution, &report));

    if report.cancelled {
        bail!("Forecast calibration cancelled");
    }

    if let Some(path) = &args.output {
        let output = ForecastOutput {
            model: &model,
            distribution: &distribution,
        };
        let json = serde_json::to_string_pretty(&output)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {path}"))?;
        tracing::info!(
            "Wrote forecasts for {} year(s) to {}",
            distribution.years().len(),
            path
        );
    }

    Ok(())
}

fn format_distribution(distribution: &ForecastDistribution, report: &CalibrationReport) -> String {
    let mut output = format!(
        "{:>6} {:>12} {:>12} {:>12} {:>12} {:>12}\n",
        "year", "10%", "30%", "50%", "70%", "90%"
    );
    for year in distribution.years() {
        if let Some(values) = distribution.get_10_30_50_70_90(year) {
            output.push_str(&format!("{year:>6}"));
            for value in values {
                output.push_str(&format!(" {value:>12.3}"));
            }
            output.push('\n');
        }
    }
    for (year, err) in &report.skipped {
        output.push_str(&format!("{year:>6} skipped: {err}\n"));
    }
    output
}
