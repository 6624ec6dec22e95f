use clap::{Parser, Subcommand};

mod commands;
mod dataset;

use commands::{ForecastArgs, SearchArgs, ValidateArgs};

#[derive(Parser)]
#[command(name = "flowcast")]
#[command(about = "Seasonal streamflow model search and forecast calibration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search predictor subsets for every configured regressor
    Search(SearchArgs),
    /// Calibrate exceedance forecasts for a chosen model
    Forecast(ForecastArgs),
    /// Load and validate a configuration file
    Validate(ValidateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Search(args) => commands::run_search(args).await?,
        Commands::Forecast(args) => commands::run_forecast(args).await?,
        Commands::Validate(args) => commands::run_validate(&args)?,
    }

    Ok(())
}
