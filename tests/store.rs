use cp_tracker::problem::{Platform, ProblemRecord, SubmissionStatus};
use cp_tracker::store::{ProblemUpdate, RecordStore, StoreError};
use serde_json::{Value, json};
use std::fs;

fn sample(platform: Platform, problem_id: &str, name: &str) -> ProblemRecord {
    serde_json::from_value(json!({
        "platform": platform,
        "problemId": problem_id,
        "name": name,
        "createdAt": "2025-01-01T00:00:00Z",
    }))
    .unwrap()
}

fn file_json(store: &RecordStore) -> Value {
    serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap()
}

#[test]
fn missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path().join("nope.json"));
    assert!(store.read().problems.is_empty());
}

#[test]
fn corrupt_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("problems.json");
    fs::write(&path, "{ not json").unwrap();
    let store = RecordStore::new(&path);
    assert!(store.read().problems.is_empty());

    fs::write(&path, r#"{"problems": 3}"#).unwrap();
    assert!(store.read().problems.is_empty());
}

#[test]
fn init_creates_directory_and_empty_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path().join("data").join("problems.json"));
    store.init().unwrap();

    let doc = file_json(&store);
    assert_eq!(doc["problems"], json!([]));
    assert!(doc["lastModified"].is_string());

    // existing content is left alone
    store.write(&[sample(Platform::Usaco, "855", "Problem 855")]).unwrap();
    store.init().unwrap();
    assert_eq!(store.read().problems.len(), 1);
}

#[test]
fn write_then_read_keeps_order_and_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path().join("problems.json"));
    let problems = vec![
        sample(Platform::Cf, "1234B", "long name"),
        sample(Platform::Usaco, "855", "Problem 855"),
    ];

    let stamp = store.write(&problems).unwrap();
    let snapshot = store.read();
    assert_eq!(snapshot.problems, problems);
    assert_eq!(snapshot.last_modified, stamp);
}

#[test]
fn invalid_entries_are_hidden_but_kept_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("problems.json");
    fs::write(
        &path,
        json!({
            "problems": [
                { "platform": "cses", "problemId": "1068", "name": "weird algorithm" },
                { "platform": "cses", "problemId": 1069, "name": "repetitions" },
                { "platform": "cses", "problemId": "1070" },
                "garbage",
            ],
            "lastModified": "2025-03-01T12:00:00Z",
        })
        .to_string(),
    )
    .unwrap();
    let store = RecordStore::new(&path);

    let snapshot = store.read();
    assert_eq!(snapshot.problems.len(), 1);
    assert_eq!(snapshot.problems[0].problem_id, "1068");
    assert_eq!(snapshot.last_modified.to_rfc3339(), "2025-03-01T12:00:00+00:00");

    store
        .update(
            "1068",
            None,
            &ProblemUpdate {
                notes: Some("classic".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    let doc = file_json(&store);
    assert_eq!(doc["problems"].as_array().unwrap().len(), 4);
    assert_eq!(doc["problems"][0]["notes"], "classic");
    assert_eq!(doc["problems"][1]["problemId"], 1069);
    assert_eq!(doc["problems"][3], "garbage");
}

#[test]
fn legacy_array_file_is_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("problems.json");
    fs::write(
        &path,
        json!([{
            "platform": "cf",
            "problemId": "1500C",
            "name": "tle-slow solution",
            "result": "Time Limit Exceeded",
            "tags": ["greedy"],
        }])
        .to_string(),
    )
    .unwrap();

    let snapshot = RecordStore::new(&path).read();
    let record = &snapshot.problems[0];
    assert_eq!(record.display_name(), "slow solution");
    assert_eq!(record.result, SubmissionStatus::TimeLimitExceeded);
    assert_eq!(record.tags, vec!["greedy".to_string()]);
}

#[test]
fn update_changes_only_supplied_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path().join("problems.json"));
    let mut record = sample(Platform::Cf, "1234B", "long name");
    record.tags = vec!["dp".to_string()];
    record.notes = "hard".to_string();
    store.write(&[record]).unwrap();

    let updated = store
        .update(
            "1234B",
            None,
            &ProblemUpdate {
                tags: Some(vec!["dp".to_string(), "greedy".to_string(), "dp".to_string()]),
                notes: None,
            },
        )
        .unwrap();

    assert_eq!(updated.tags, vec!["dp".to_string(), "greedy".to_string()]);
    assert_eq!(updated.notes, "hard");
    assert!(updated.updated_at.is_some());
    assert_eq!(store.read().problems[0], updated);
}

#[test]
fn update_respects_platform_when_given() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path().join("problems.json"));
    store
        .write(&[
            sample(Platform::Usaco, "1234", "Problem 1234"),
            sample(Platform::Cses, "1234", "two sum"),
        ])
        .unwrap();

    let notes = ProblemUpdate {
        notes: Some("cses one".to_string()),
        ..Default::default()
    };
    let updated = store.update("1234", Some(Platform::Cses), &notes).unwrap();
    assert_eq!(updated.platform, Platform::Cses);

    let problems = store.read().problems;
    assert_eq!(problems[0].notes, "");
    assert_eq!(problems[1].notes, "cses one");
}

#[test]
fn update_of_unknown_problem_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path().join("problems.json"));
    store.write(&[sample(Platform::Usaco, "855", "Problem 855")]).unwrap();
    let before = fs::read_to_string(store.path()).unwrap();

    let err = store
        .update("9999Z", None, &ProblemUpdate::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
    assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
}

#[test]
fn modify_sees_current_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path().join("problems.json"));
    store.write(&[sample(Platform::Usaco, "855", "Problem 855")]).unwrap();

    let (count, _) = store
        .modify(|mut problems| {
            problems.push(sample(Platform::Usaco, "856", "Problem 856"));
            let count = problems.len();
            (problems, count)
        })
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(store.read().problems.len(), 2);
}

#[test]
fn missing_created_at_stays_missing_across_reads_and_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("problems.json");
    fs::write(
        &path,
        json!([{ "platform": "usaco", "problemId": "855", "name": "Problem 855" }]).to_string(),
    )
    .unwrap();
    let store = RecordStore::new(&path);

    let first = store.read().problems;
    let second = store.read().problems;
    assert_eq!(first, second);
    assert!(first[0].created_at.is_none());

    store
        .update(
            "855",
            None,
            &ProblemUpdate {
                notes: Some("silver".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    let doc = file_json(&store);
    assert!(doc["problems"][0].get("createdAt").is_none());
    assert!(doc["problems"][0]["updatedAt"].is_string());
}

#[test]
fn modify_keeps_invalid_entries_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("problems.json");
    fs::write(
        &path,
        json!({
            "problems": [
                { "platform": "cses", "problemId": 1067, "name": "broken" },
                { "platform": "cses", "problemId": "1068", "name": "weird algorithm" },
                "garbage",
                { "platform": "cses", "problemId": "1069", "name": "repetitions" },
            ],
            "lastModified": "2025-03-01T12:00:00Z",
        })
        .to_string(),
    )
    .unwrap();
    let store = RecordStore::new(&path);

    for _ in 0..2 {
        store
            .modify(|mut problems| {
                for problem in &mut problems {
                    problem.code = "// rescanned".to_string();
                }
                (problems, ())
            })
            .unwrap();
    }

    let doc = file_json(&store);
    let entries = doc["problems"].as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0]["problemId"], 1067);
    assert_eq!(entries[1]["problemId"], "1068");
    assert_eq!(entries[1]["code"], "// rescanned");
    assert_eq!(entries[2], "garbage");
    assert_eq!(entries[3]["problemId"], "1069");
}
