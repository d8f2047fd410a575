use lazy_static::lazy_static;
use regex::Regex;

use crate::problem::{Platform, SubmissionStatus, strip_tle_marker};

lazy_static! {
    static ref CSES_FOLDER_REGEX: Regex = Regex::new(r"^(\d+)-(.+)$").unwrap();
    // `1234b-name` and `1234-b-name` are both in use upstream
    static ref CF_FOLDER_REGEX: Regex = Regex::new(r"^(\d+)-?([A-Za-z])-(.+)$").unwrap();
}

/// Fields derived from an upstream folder name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedFolder {
    pub problem_id: String,
    pub name: String,
    pub status: SubmissionStatus,
}

/// Result of parsing one folder name
///
/// Folders that don't follow the platform's naming convention are
/// `Skipped`; they are not an error and the scan carries on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FolderParse {
    Matched(ParsedFolder),
    Skipped,
}

impl FolderParse {
    pub fn matched(self) -> Option<ParsedFolder> {
        match self {
            FolderParse::Matched(parsed) => Some(parsed),
            FolderParse::Skipped => None,
        }
    }
}

/// Parse a platform directory name into a problem identifier and title
///
/// A leading `tle-` (any case) marks a Time Limit Exceeded submission and is
/// removed before the platform pattern is applied:
///
/// * `usaco`: `855` → id `855`, name `Problem 855`
/// * `cses`: `1068-weird-algorithm` → id `1068`, name `weird algorithm`
/// * `cf`: `1234-b-long-name` or `1234b-long-name` → id `1234B`, name `long name`
///
/// # Examples
/// ```
/// use cp_tracker::parser::{FolderParse, parse_folder_name};
/// use cp_tracker::problem::{Platform, SubmissionStatus};
///
/// let parsed = parse_folder_name(Platform::Cses, "tle-1234-two-sum").matched().unwrap();
/// assert_eq!(parsed.problem_id, "1234");
/// assert_eq!(parsed.name, "two sum");
/// assert_eq!(parsed.status, SubmissionStatus::TimeLimitExceeded);
///
/// assert_eq!(parse_folder_name(Platform::Cses, "not-a-valid-name-format"), FolderParse::Skipped);
/// ```
pub fn parse_folder_name(platform: Platform, folder_name: &str) -> FolderParse {
    let (status, rest) = match strip_tle_marker(folder_name) {
        Some(rest) => (SubmissionStatus::TimeLimitExceeded, rest),
        None => (SubmissionStatus::Accepted, folder_name),
    };

    let decomposed = match platform {
        Platform::Usaco => parse_usaco(rest),
        Platform::Cses => parse_cses(rest),
        Platform::Cf => parse_cf(rest),
    };

    match decomposed {
        Some((problem_id, name)) => FolderParse::Matched(ParsedFolder {
            problem_id,
            name,
            status,
        }),
        None => FolderParse::Skipped,
    }
}

fn parse_usaco(rest: &str) -> Option<(String, String)> {
    if rest.is_empty() {
        return None;
    }
    Some((rest.to_string(), format!("Problem {}", rest)))
}

fn parse_cses(rest: &str) -> Option<(String, String)> {
    let caps = CSES_FOLDER_REGEX.captures(rest)?;
    Some((caps[1].to_string(), dashes_to_spaces(&caps[2])))
}

fn parse_cf(rest: &str) -> Option<(String, String)> {
    let caps = CF_FOLDER_REGEX.captures(rest)?;
    let problem_id = format!("{}{}", &caps[1], caps[2].to_ascii_uppercase());
    Some((problem_id, dashes_to_spaces(&caps[3])))
}

fn dashes_to_spaces(slug: &str) -> String {
    slug.replace('-', " ")
}
