use chrono::{DateTime, Utc};

use crate::parser::ParsedFolder;
use crate::problem::{Platform, ProblemRecord, SubmissionStatus};
use crate::source::SourceUrls;

/// A problem as seen upstream during one scan pass
#[derive(Clone, Debug, PartialEq)]
pub struct ScannedProblem {
    pub platform: Platform,
    pub problem_id: String,
    pub name: String,
    pub status: SubmissionStatus,
    pub folder_name: String,
    pub urls: SourceUrls,
    pub code: String,
}

impl ScannedProblem {
    pub fn new(
        platform: Platform,
        folder_name: &str,
        parsed: ParsedFolder,
        urls: SourceUrls,
        code: String,
    ) -> Self {
        ScannedProblem {
            platform,
            problem_id: parsed.problem_id,
            name: parsed.name,
            status: parsed.status,
            folder_name: folder_name.to_string(),
            urls,
            code,
        }
    }

    fn into_record(self, now: DateTime<Utc>) -> ProblemRecord {
        ProblemRecord {
            platform: self.platform,
            problem_id: self.problem_id,
            name: self.name,
            code: self.code,
            source_file: self.urls.source_file,
            raw_source_file: self.urls.raw_source_file,
            folder_name: self.folder_name,
            tags: Vec::new(),
            notes: String::new(),
            result: self.status,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Overwrite the derived fields of `record`, leaving annotations alone
    fn refresh(self, record: &mut ProblemRecord, now: DateTime<Utc>) {
        record.name = self.name;
        record.code = self.code;
        record.source_file = self.urls.source_file;
        record.raw_source_file = self.urls.raw_source_file;
        record.folder_name = self.folder_name;
        record.result = self.status;
        record.updated_at = Some(now);
    }
}

/// What changed while merging a scan into the stored collection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileChange {
    pub added: usize,
    pub updated: usize,
}

/// Merged collection plus counts
#[derive(Clone, Debug)]
pub struct Reconciled {
    pub problems: Vec<ProblemRecord>,
    pub change: ReconcileChange,
}

/// Merge freshly scanned problems into the previous collection
///
/// A scanned problem whose (platform, problemId) already exists refreshes
/// that record in place; `tags`, `notes` and `createdAt` are kept. Unknown
/// keys are appended with empty annotations. Records that were not seen in
/// this pass stay as they are.
pub fn reconcile(
    previous: Vec<ProblemRecord>,
    scanned: Vec<ScannedProblem>,
    now: DateTime<Utc>,
) -> Reconciled {
    let mut problems = previous;
    let mut change = ReconcileChange::default();

    for fresh in scanned {
        let existing = problems
            .iter_mut()
            .find(|p| p.has_key(fresh.platform, &fresh.problem_id));

        match existing {
            Some(record) => {
                log::info!(
                    "Updated {} problem {}{}",
                    fresh.platform.as_str().to_uppercase(),
                    fresh.problem_id,
                    tle_suffix(fresh.status)
                );
                fresh.refresh(record, now);
                change.updated += 1;
            }
            None => {
                log::info!(
                    "Added {} problem {}{}",
                    fresh.platform.as_str().to_uppercase(),
                    fresh.problem_id,
                    tle_suffix(fresh.status)
                );
                problems.push(fresh.into_record(now));
                change.added += 1;
            }
        }
    }

    Reconciled { problems, change }
}

fn tle_suffix(status: SubmissionStatus) -> &'static str {
    if status.is_tle() { " (TLE)" } else { "" }
}
