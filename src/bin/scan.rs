#![cfg(not(tarpaulin_include))]

use cp_tracker::config::Config;
use cp_tracker::scanner::scan_pass;
use cp_tracker::source::GitHubClient;
use cp_tracker::store::RecordStore;

/// Run a single scan pass and exit
///
/// Useful to seed the problems file before starting the server, or from
/// cron when the server isn't running.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let store = RecordStore::new(&config.data_file);
    store.init()?;

    let client = GitHubClient::new(
        config.repo.clone(),
        &config.github_api_url,
        config.github_token.as_deref(),
        config.http_timeout,
    )?;

    let report = scan_pass(&client, &config.repo, &store).await?;
    println!(
        "{} added, {} updated, {} skipped, {} fetch failures",
        report.change.added, report.change.updated, report.skipped, report.fetch_failures
    );

    Ok(())
}
