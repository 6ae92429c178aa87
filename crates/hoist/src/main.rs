use std::process::ExitCode;

use clap::Parser;
use hoist_core::Outcome;

mod cli;
mod telemetry;

use cli::app::App;

#[tokio::main]
async fn main() -> ExitCode {
    let app = App::parse();
    let level = if app.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    telemetry::init_tracing(app.log_json, level);

    match cli::dispatch(app).await {
        Ok(Outcome::Completed(())) => ExitCode::SUCCESS,
        Ok(Outcome::Cancelled) => {
            tracing::debug!("cancelled by user");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
