use std::path::Path;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};

use crate::config::ForecastProblem;

pub const DEFAULT_CONFIG_PATH: &str = "config/Flowcast.toml";
const ENV_PREFIX: &str = "FLOWCAST_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the forecast problem from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read, parsed or validated.
    pub fn load() -> Result<ForecastProblem> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads a forecast problem by merging the TOML file at `path`, an optional
    /// JSON sibling with the same stem, and `FLOWCAST_`-prefixed environment
    /// variables (`__` separates nested keys, e.g.
    /// `FLOWCAST_SETTINGS__TIME_BUDGET_MINUTES=2`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read, parsed or validated.
    pub fn load_from(path: impl AsRef<Path>) -> Result<ForecastProblem> {
        let path = path.as_ref();
        let problem: ForecastProblem = Figment::new()
            .merge(Toml::file(path))
            .join(Json::file(path.with_extension("json")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;

        problem
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;

        tracing::debug!(
            predictors = problem.predictors.len(),
            regressors = problem.regressors.len(),
            "Loaded forecast configuration"
        );
        Ok(problem)
    }

    /// Parses a forecast problem from TOML text, without touching the
    /// filesystem or environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or fails validation.
    pub fn from_toml_str(text: &str) -> Result<ForecastProblem> {
        let problem: ForecastProblem = Figment::new()
            .merge(Toml::string(text))
            .extract()
            .context("failed to parse configuration")?;
        problem.validate()?;
        Ok(problem)
    }
}
