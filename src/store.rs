use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, create_dir_all};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

use crate::problem::{Platform, ProblemRecord, dedup_tags};

/// Failure reading or writing the problems file
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("problems file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("problems file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("problems file has an unexpected shape")]
    Shape,

    #[error("Problem not found")]
    NotFound,
}

/// Problems as returned to readers, with the store's timestamp
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub problems: Vec<ProblemRecord>,
    pub last_modified: DateTime<Utc>,
}

/// User-editable fields of a record
///
/// Fields left as `None` keep their stored value.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProblemUpdate {
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl ProblemUpdate {
    pub fn apply(&self, record: &mut ProblemRecord, now: DateTime<Utc>) {
        if let Some(tags) = &self.tags {
            record.tags = dedup_tags(tags.clone());
        }
        if let Some(notes) = &self.notes {
            record.notes = notes.clone();
        }
        record.updated_at = Some(now);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreDocument<'a> {
    problems: &'a [Value],
    last_modified: DateTime<Utc>,
}

/// The JSON file holding every problem record
///
/// Every operation goes through the file; nothing is cached between calls.
/// Writers inside one process are serialized by `write_lock`, and each write
/// replaces the whole file through a temporary file in the same directory.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RecordStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the data directory and an empty problems file if missing
    ///
    /// # Errors
    /// * Returns an error if the directory or file cannot be created; the
    ///   server treats this as fatal
    pub fn init(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                create_dir_all(dir)?;
            }
        }

        if !self.path.exists() {
            let _guard = self.lock();
            self.write_entries(&[], Utc::now())?;
        }

        Ok(())
    }

    /// Read all valid problems
    ///
    /// Never fails: a missing or malformed file reads as an empty collection.
    /// Entries without a string `problemId` and `name`, or that otherwise
    /// don't decode, are left out of the result but stay in the file.
    pub fn read(&self) -> StoreSnapshot {
        match self.load_entries() {
            Ok((entries, last_modified)) => {
                let (problems, rejected) = partition(entries);
                if !rejected.is_empty() {
                    log::debug!("Skipped {} invalid problem entries", rejected.len());
                }
                StoreSnapshot {
                    problems,
                    last_modified: last_modified
                        .or_else(|| self.file_mtime())
                        .unwrap_or_else(Utc::now),
                }
            }
            Err(e) => {
                log::warn!("Error reading problems from {}: {}", self.path.display(), e);
                StoreSnapshot {
                    problems: Vec::new(),
                    last_modified: Utc::now(),
                }
            }
        }
    }

    /// Replace the whole collection
    ///
    /// Returns the `lastModified` stamp written to the file.
    pub fn write(&self, problems: &[ProblemRecord]) -> Result<DateTime<Utc>, StoreError> {
        let _guard = self.lock();
        let entries = to_values(problems)?;
        let now = Utc::now();
        self.write_entries(&entries, now)?;
        Ok(now)
    }

    /// Read, transform and write the collection while holding the write lock
    ///
    /// `f` receives the currently valid records and returns the records to
    /// persist. Entries that failed validation are carried over untouched at
    /// their original positions.
    pub fn modify<T, F>(&self, f: F) -> Result<(T, DateTime<Utc>), StoreError>
    where
        F: FnOnce(Vec<ProblemRecord>) -> (Vec<ProblemRecord>, T),
    {
        let _guard = self.lock();
        let entries = self.load_entries_or_empty()?;
        let (problems, rejected) = partition(entries);

        let (next, out) = f(problems);

        let mut entries = to_values(&next)?;
        for (index, entry) in rejected {
            entries.insert(index.min(entries.len()), entry);
        }
        let now = Utc::now();
        self.write_entries(&entries, now)?;
        Ok((out, now))
    }

    /// Apply a user edit to one record and persist the collection
    ///
    /// The first record whose `problemId` matches (and whose platform
    /// matches, when one is given) is updated.
    ///
    /// # Errors
    /// * `StoreError::NotFound` if no record matches; the file is not touched
    pub fn update(
        &self,
        problem_id: &str,
        platform: Option<Platform>,
        update: &ProblemUpdate,
    ) -> Result<ProblemRecord, StoreError> {
        let _guard = self.lock();
        let mut entries = self.load_entries_or_empty()?;

        let found = entries.iter().enumerate().find_map(|(i, entry)| {
            decode_entry(entry)
                .filter(|p| {
                    p.problem_id == problem_id && platform.is_none_or(|pl| p.platform == pl)
                })
                .map(|p| (i, p))
        });

        let Some((index, mut record)) = found else {
            return Err(StoreError::NotFound);
        };

        let now = Utc::now();
        update.apply(&mut record, now);
        entries[index] = serde_json::to_value(&record)?;
        self.write_entries(&entries, now)?;

        Ok(record)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn file_mtime(&self) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(&self.path).ok()?.modified().ok()?;
        Some(modified.into())
    }

    /// Raw entries plus the stored `lastModified`, if the file has one
    ///
    /// Accepts both `{ "problems": [...], "lastModified": ... }` and a bare
    /// array of records.
    fn load_entries(&self) -> Result<(Vec<Value>, Option<DateTime<Utc>>), StoreError> {
        let contents = fs::read_to_string(&self.path)?;
        let document: Value = serde_json::from_str(&contents)?;

        match document {
            Value::Array(entries) => Ok((entries, None)),
            Value::Object(mut map) => {
                let entries = match map.remove("problems") {
                    Some(Value::Array(entries)) => entries,
                    _ => return Err(StoreError::Shape),
                };
                let last_modified = map
                    .get("lastModified")
                    .and_then(Value::as_str)
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|t| t.with_timezone(&Utc));
                Ok((entries, last_modified))
            }
            _ => Err(StoreError::Shape),
        }
    }

    /// Like `load_entries`, but a missing or unreadable document is empty
    fn load_entries_or_empty(&self) -> Result<Vec<Value>, StoreError> {
        match self.load_entries() {
            Ok((entries, _)) => Ok(entries),
            Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e @ (StoreError::Json(_) | StoreError::Shape)) => {
                log::warn!(
                    "Treating {} as empty: {}",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn write_entries(&self, entries: &[Value], last_modified: DateTime<Utc>) -> Result<(), StoreError> {
        let document = StoreDocument {
            problems: entries,
            last_modified,
        };
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, &document)?;
        file.write_all(b"\n")?;
        file.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }
}

/// Decode a raw entry if it carries the required string fields
fn decode_entry(entry: &Value) -> Option<ProblemRecord> {
    let has_required = entry.get("problemId").is_some_and(Value::is_string)
        && entry.get("name").is_some_and(Value::is_string);
    if !has_required {
        return None;
    }
    serde_json::from_value(entry.clone()).ok()
}

/// Split raw entries into valid records and the rest, keyed by file index
fn partition(entries: Vec<Value>) -> (Vec<ProblemRecord>, Vec<(usize, Value)>) {
    let mut problems = Vec::with_capacity(entries.len());
    let mut rejected = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        match decode_entry(&entry) {
            Some(problem) => problems.push(problem),
            None => rejected.push((index, entry)),
        }
    }
    (problems, rejected)
}

fn to_values(problems: &[ProblemRecord]) -> Result<Vec<Value>, StoreError> {
    problems
        .iter()
        .map(|p| serde_json::to_value(p).map_err(StoreError::from))
        .collect()
}
