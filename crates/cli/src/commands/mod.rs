//! CLI commands for model search and forecast calibration.

pub mod forecast;
pub mod search;
pub mod validate;

pub use forecast::{run_forecast, ForecastArgs};
pub use search::{run_search, SearchArgs};
pub use validate::{run_validate, ValidateArgs};

use std::sync::atomic::Ordering;

use flowcast_core::CancellationFlag;

/// Raises `cancel` on the first Ctrl+C.
fn cancel_on_ctrl_c(cancel: &CancellationFlag) {
    let stop_on_ctrl_c = cancel.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, stopping after the current step");
            stop_on_ctrl_c.store(true, Ordering::SeqCst);
        }
    });
}
