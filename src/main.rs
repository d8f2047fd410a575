#![cfg(not(tarpaulin_include))]

use cp_tracker::app;
use cp_tracker::config::Config;

/// Main entry point for the dashboard server
///
/// Reads the configuration from the environment, starts the periodic
/// scanner and serves the problems API.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    log::info!(
        "Tracking {}/{}@{}, scanning every {}s",
        config.repo.owner,
        config.repo.repo,
        config.repo.branch,
        config.scan_interval.as_secs()
    );

    app::run(config).await
}
