use std::path::PathBuf;
use std::time::Duration;

use crate::source::RepoCoordinate;

/// Invalid value in the environment
#[derive(Debug, thiserror::Error)]
#[error("{key} must be {expected}, got {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// Runtime settings, read from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub repo: RepoCoordinate,
    pub github_api_url: String,
    pub github_token: Option<String>,
    pub data_file: PathBuf,
    pub scan_interval: Duration,
    pub http_timeout: Duration,
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
    /// Built client bundle to serve, if any
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 4001,
            repo: RepoCoordinate::default(),
            github_api_url: "https://api.github.com".to_string(),
            github_token: None,
            data_file: PathBuf::from("data/problems.json"),
            scan_interval: Duration::from_secs(5 * 60),
            http_timeout: Duration::from_secs(30),
            allowed_origins: Vec::new(),
            static_dir: None,
        }
    }
}

impl Config {
    /// Build the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup
    ///
    /// Unset or blank keys fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Config::default();

        if let Some(v) = get("BIND_ADDR") {
            config.bind_addr = v;
        }
        if let Some(v) = get("PORT") {
            config.port = parse_number("PORT", &v)?;
        }
        if let Some(v) = get("REPO_OWNER") {
            config.repo.owner = v;
        }
        if let Some(v) = get("REPO_NAME") {
            config.repo.repo = v;
        }
        if let Some(v) = get("REPO_BRANCH") {
            config.repo.branch = v;
        }
        if let Some(v) = get("GITHUB_RAW_URL") {
            config.repo.raw_base = v;
        }
        if let Some(v) = get("GITHUB_API_URL") {
            config.github_api_url = v;
        }
        config.github_token = get("GITHUB_TOKEN");
        if let Some(v) = get("DATA_FILE") {
            config.data_file = PathBuf::from(v);
        }
        if let Some(v) = get("SCAN_INTERVAL_SECS") {
            config.scan_interval = parse_seconds("SCAN_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = get("HTTP_TIMEOUT_SECS") {
            config.http_timeout = parse_seconds("HTTP_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("ALLOWED_ORIGINS") {
            config.allowed_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        config.static_dir = get("STATIC_DIR").map(PathBuf::from);

        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError {
        key,
        expected: "a number",
        value: value.to_string(),
    })
}

/// A zero duration would fire the timer or time out requests immediately
fn parse_seconds(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match parse_number::<u64>(key, value)? {
        0 => Err(ConfigError {
            key,
            expected: "a positive number of seconds",
            value: value.to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}
