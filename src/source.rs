use serde::Deserialize;
use std::future::Future;

use crate::problem::Platform;

/// File every solution folder is expected to contain
pub const SOLUTION_FILE: &str = "main.cpp";

/// Location of the solutions repository
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoCoordinate {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Base of the human-facing site, `https://github.com`
    pub web_base: String,
    /// Base of the raw content host, `https://raw.githubusercontent.com`
    pub raw_base: String,
}

impl Default for RepoCoordinate {
    fn default() -> Self {
        RepoCoordinate {
            owner: "ZigaoWang".to_string(),
            repo: "usaco-cses-cf".to_string(),
            branch: "main".to_string(),
            web_base: "https://github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
        }
    }
}

/// Viewable and raw URLs of one solution file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceUrls {
    pub source_file: String,
    pub raw_source_file: String,
}

impl SourceUrls {
    /// Build the URLs of `<platform>/<folder>/main.cpp`
    ///
    /// # Examples
    /// ```
    /// use cp_tracker::problem::Platform;
    /// use cp_tracker::source::{RepoCoordinate, SourceUrls};
    ///
    /// let urls = SourceUrls::for_folder(&RepoCoordinate::default(), Platform::Usaco, "855");
    /// assert_eq!(
    ///     urls.raw_source_file,
    ///     "https://raw.githubusercontent.com/ZigaoWang/usaco-cses-cf/main/usaco/855/main.cpp"
    /// );
    /// ```
    pub fn for_folder(coord: &RepoCoordinate, platform: Platform, folder_name: &str) -> Self {
        let file_path = format!("{}/{}/{}", platform, folder_name, SOLUTION_FILE);
        SourceUrls {
            source_file: format!(
                "{}/{}/{}/blob/{}/{}",
                coord.web_base.trim_end_matches('/'),
                coord.owner,
                coord.repo,
                coord.branch,
                file_path
            ),
            raw_source_file: format!(
                "{}/{}/{}/{}/{}",
                coord.raw_base.trim_end_matches('/'),
                coord.owner,
                coord.repo,
                coord.branch,
                file_path
            ),
        }
    }
}

/// One entry of a directory listing
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    /// `file`, `dir`, `symlink` or `submodule`
    #[serde(rename = "type")]
    pub kind: String,
}

impl TreeEntry {
    pub fn dir(name: &str) -> Self {
        TreeEntry {
            name: name.to_string(),
            kind: "dir".to_string(),
        }
    }

    pub fn file(name: &str) -> Self {
        TreeEntry {
            name: name.to_string(),
            kind: "file".to_string(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == "dir"
    }
}

/// Failure talking to the upstream repository
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Read access to the solutions repository
///
/// The scanner only needs directory listings and raw file text, so tests can
/// swap the GitHub client for an in-memory tree.
pub trait SourceTree: Send + Sync {
    /// Top-level entries under the platform's directory
    fn list_platform(
        &self,
        platform: Platform,
    ) -> impl Future<Output = Result<Vec<TreeEntry>, UpstreamError>> + Send;

    /// Literal text behind a raw URL
    fn fetch_raw(&self, url: &str) -> impl Future<Output = Result<String, UpstreamError>> + Send;
}

#[cfg(feature = "web")]
pub use github::GitHubClient;

#[cfg(feature = "web")]
mod github {
    use super::*;
    use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
    use std::time::Duration;

    /// `SourceTree` backed by the GitHub contents API and raw host
    #[derive(Clone, Debug)]
    pub struct GitHubClient {
        http: reqwest::Client,
        api_base: String,
        coord: RepoCoordinate,
    }

    impl GitHubClient {
        pub fn new(
            coord: RepoCoordinate,
            api_base: &str,
            token: Option<&str>,
            timeout: Duration,
        ) -> Result<Self, UpstreamError> {
            let mut headers = HeaderMap::new();
            headers.insert(USER_AGENT, HeaderValue::from_static("cp-tracker"));
            if let Some(token) = token {
                let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                    UpstreamError::Transport {
                        url: api_base.to_string(),
                        message: format!("invalid token: {}", e),
                    }
                })?;
                headers.insert(AUTHORIZATION, value);
            }

            let http = reqwest::Client::builder()
                .default_headers(headers)
                .timeout(timeout)
                .build()
                .map_err(|e| UpstreamError::Transport {
                    url: api_base.to_string(),
                    message: e.to_string(),
                })?;

            Ok(GitHubClient {
                http,
                api_base: api_base.trim_end_matches('/').to_string(),
                coord,
            })
        }

        fn contents_url(&self, platform: Platform) -> String {
            format!(
                "{}/repos/{}/{}/contents/{}?ref={}",
                self.api_base, self.coord.owner, self.coord.repo, platform, self.coord.branch
            )
        }

        async fn get(
            &self,
            url: &str,
            accept: Option<&'static str>,
        ) -> Result<reqwest::Response, UpstreamError> {
            let mut request = self.http.get(url);
            if let Some(accept) = accept {
                request = request.header(ACCEPT, accept);
            }

            let response = request.send().await.map_err(|e| UpstreamError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(UpstreamError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            Ok(response)
        }
    }

    impl SourceTree for GitHubClient {
        async fn list_platform(&self, platform: Platform) -> Result<Vec<TreeEntry>, UpstreamError> {
            let url = self.contents_url(platform);
            let response = self
                .get(&url, Some("application/vnd.github.v3+json"))
                .await?;
            response
                .json::<Vec<TreeEntry>>()
                .await
                .map_err(|e| UpstreamError::Decode {
                    url,
                    message: e.to_string(),
                })
        }

        async fn fetch_raw(&self, url: &str) -> Result<String, UpstreamError> {
            let response = self.get(url, None).await?;
            response.text().await.map_err(|e| UpstreamError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
        }
    }
}
