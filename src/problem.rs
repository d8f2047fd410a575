use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform namespace a problem belongs to
///
/// Each platform is a top-level directory in the solutions repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Usaco,
    Cses,
    Cf,
}

impl Platform {
    /// Every platform, in scan order
    pub const ALL: [Platform; 3] = [Platform::Usaco, Platform::Cses, Platform::Cf];

    /// Directory name of the platform in the upstream repository
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Usaco => "usaco",
            Platform::Cses => "cses",
            Platform::Cf => "cf",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "usaco" => Ok(Platform::Usaco),
            "cses" => Ok(Platform::Cses),
            "cf" | "codeforces" => Ok(Platform::Cf),
            other => Err(format!("Unknown platform: {}", other)),
        }
    }
}

/// Judge outcome recorded for a solution
///
/// Derived only from the folder name, never from re-running the code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[default]
    Accepted,
    #[serde(rename = "Time Limit Exceeded")]
    TimeLimitExceeded,
}

impl SubmissionStatus {
    pub fn is_tle(&self) -> bool {
        matches!(self, SubmissionStatus::TimeLimitExceeded)
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accepted" | "ac" => Ok(SubmissionStatus::Accepted),
            "tle" | "time limit exceeded" => Ok(SubmissionStatus::TimeLimitExceeded),
            other => Err(format!("Unknown result: {}", other)),
        }
    }
}

/// One tracked solution
///
/// Derived fields (`name`, `code`, `result`, source URLs, `folder_name`) are
/// refreshed by every scan. `tags` and `notes` belong to the user and only
/// change through an explicit update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRecord {
    pub platform: Platform,
    pub problem_id: String,
    pub name: String,

    #[serde(default)]
    pub code: String,

    /// GitHub page showing `main.cpp`
    #[serde(default, alias = "sourceLocation")]
    pub source_file: String,

    /// Raw text of `main.cpp`
    #[serde(default, alias = "rawSourceLocation")]
    pub raw_source_file: String,

    /// Upstream directory the record was derived from
    #[serde(default)]
    pub folder_name: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub notes: String,

    #[serde(default, alias = "submissionStatus")]
    pub result: SubmissionStatus,

    /// Missing on entries written before creation times were recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProblemRecord {
    /// Name shown to users, without the `tle-` marker older scans prefixed
    pub fn display_name(&self) -> &str {
        strip_tle_marker(&self.name).unwrap_or(&self.name)
    }

    /// Whether this record has the given natural key
    pub fn has_key(&self, platform: Platform, problem_id: &str) -> bool {
        self.platform == platform && self.problem_id == problem_id
    }
}

/// Strip a case-insensitive `tle-` prefix, returning the rest if present
pub fn strip_tle_marker(name: &str) -> Option<&str> {
    let prefix = name.get(..4)?;
    if prefix.eq_ignore_ascii_case("tle-") {
        Some(&name[4..])
    } else {
        None
    }
}

/// Drop repeated tags, keeping the first occurrence of each
pub fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
