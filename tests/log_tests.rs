mod common;

use common::increment;
use serde_json::json;
use statefold::{create_action, line_hash, Action, ActionLog, Error, LockMode};
use std::fs;
use std::io::Write;
use tempfile::tempdir;

fn append_n(log: &mut ActionLog, n: usize) {
    for i in 0..n {
        log.append(&create_action(format!("ACTION_{i}"), json!({"i": i})))
            .unwrap();
    }
}

#[test]
fn test_open_creates_directory() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("a/b");
    let log = ActionLog::open(&nested).unwrap();
    assert!(log.log_path().exists());
    assert_eq!(log.dir(), nested.as_path());
    assert_eq!(log.active_log_size().unwrap(), 0);
}

#[test]
fn test_append_reports_offsets_and_hash() {
    let dir = tempdir().unwrap();
    let mut log = ActionLog::open(dir.path()).unwrap();

    let first = log.append(&increment()).unwrap();
    let line = r#"{"type":"COUNTER_INCREMENT"}"#;
    assert_eq!(first.offset, 0);
    assert_eq!(first.end, line.len() as u64 + 1);
    assert_eq!(first.hash, line_hash(line.as_bytes()));

    let second = log.append(&increment()).unwrap();
    assert_eq!(second.offset, first.end);
    assert_eq!(log.active_log_size().unwrap(), second.end);
}

#[test]
fn test_read_from_start() {
    let dir = tempdir().unwrap();
    let mut log = ActionLog::open(dir.path()).unwrap();
    append_n(&mut log, 3);

    let actions: Vec<_> = log
        .read_from(0)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(actions.len(), 3);
    assert_eq!(actions[0].0.action_type, "ACTION_0");
    assert_eq!(actions[2].0.payload, Some(json!({"i": 2})));
}

#[test]
fn test_read_from_offset() {
    let dir = tempdir().unwrap();
    let mut log = ActionLog::open(dir.path()).unwrap();
    append_n(&mut log, 2);
    let mid = log.active_log_size().unwrap();
    append_n(&mut log, 1);

    let actions: Vec<_> = log
        .read_from(mid)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].0.action_type, "ACTION_0");
    assert_eq!(actions[0].1, log.active_log_size().unwrap());
}

#[test]
fn test_read_line_hash_before() {
    let dir = tempdir().unwrap();
    let mut log = ActionLog::open(dir.path()).unwrap();
    log.append(&Action::new("A")).unwrap();
    let b = log.append(&Action::new("B")).unwrap();

    assert_eq!(log.read_line_hash_before(0).unwrap(), None);
    assert_eq!(log.read_line_hash_before(b.end).unwrap(), Some(b.hash));
    assert_eq!(log.read_line_hash_before(b.end + 10).unwrap(), None);
}

#[test]
fn test_read_line_hash_before_long_line() {
    let dir = tempdir().unwrap();
    let mut log = ActionLog::open(dir.path()).unwrap();
    log.append(&Action::new("A")).unwrap();
    let long = log
        .append(&create_action("NOTE", json!("x".repeat(20 * 1024))))
        .unwrap();

    assert!(long.end - long.offset > 16 * 1024);
    assert_eq!(log.read_line_hash_before(long.end).unwrap(), Some(long.hash));
}

#[test]
fn test_empty_lines_skipped() {
    let dir = tempdir().unwrap();
    let mut log = ActionLog::open(dir.path()).unwrap();
    log.append(&Action::new("A")).unwrap();
    {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(log.log_path())
            .unwrap();
        writeln!(file).unwrap();
    }
    log.append(&Action::new("B")).unwrap();

    let types: Vec<String> = log
        .read_from(0)
        .unwrap()
        .map(|r| r.unwrap().0.action_type)
        .collect();
    assert_eq!(types, vec!["A", "B"]);
}

#[test]
fn test_malformed_line_is_corrupt() {
    let dir = tempdir().unwrap();
    let mut log = ActionLog::open_with_lock(dir.path(), LockMode::None).unwrap();
    log.append(&Action::new("A")).unwrap();
    let b = log.append(&Action::new("B")).unwrap();
    {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(log.log_path())
            .unwrap();
        writeln!(file, "not json").unwrap();
    }

    let results: Vec<_> = log.read_from(0).unwrap().collect();
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    match &results[2] {
        Err(Error::Corrupt { offset, .. }) => assert_eq!(*offset, b.end),
        other => panic!("expected corrupt line error, got {other:?}"),
    }

    // Offsets stay absolute when reading starts mid-file.
    let results: Vec<_> = log.read_from(b.offset).unwrap().collect();
    match &results[1] {
        Err(Error::Corrupt { offset, .. }) => assert_eq!(*offset, b.end),
        other => panic!("expected corrupt line error, got {other:?}"),
    }
}

#[test]
fn test_invalid_utf8_line_is_corrupt() {
    let dir = tempdir().unwrap();
    let mut log = ActionLog::open_with_lock(dir.path(), LockMode::None).unwrap();
    let a = log.append(&Action::new("A")).unwrap();
    {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(log.log_path())
            .unwrap();
        file.write_all(b"{\"type\":\"\xff\xfe\"}\n").unwrap();
    }

    let results: Vec<_> = log.read_from(0).unwrap().collect();
    assert_eq!(results.len(), 2);
    match &results[1] {
        Err(Error::Corrupt { offset, .. }) => assert_eq!(*offset, a.end),
        other => panic!("expected corrupt line error, got {other:?}"),
    }
}

#[test]
fn test_read_full_without_archive_matches_active() {
    let dir = tempdir().unwrap();
    let mut log = ActionLog::open(dir.path()).unwrap();
    append_n(&mut log, 4);

    let full: Vec<_> = log
        .read_full()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let active: Vec<_> = log
        .read_from(0)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(full.len(), 4);
    for ((a, ha), (b, _, hb)) in full.iter().zip(active.iter()) {
        assert_eq!(a, b);
        assert_eq!(ha, hb);
    }
}
