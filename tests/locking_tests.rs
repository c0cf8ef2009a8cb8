mod common;

use common::{app_reducer, AppState};
use statefold::{ActionLog, Error, LockMode, Store};
use tempfile::tempdir;

#[test]
fn test_second_store_fails() {
    let dir = tempdir().unwrap();
    let _store = Store::builder(AppState::default(), app_reducer)
        .dir(dir.path())
        .open()
        .unwrap();

    let result = Store::builder(AppState::default(), app_reducer)
        .dir(dir.path())
        .open();
    match result {
        Err(Error::Locked { path }) => assert!(path.ends_with(".lock")),
        Err(other) => panic!("expected lock error, got {other}"),
        Ok(_) => panic!("second store should fail to open"),
    }
}

#[test]
fn test_lock_error_mentions_path() {
    let dir = tempdir().unwrap();
    let _log = ActionLog::open(dir.path()).unwrap();
    let err = ActionLog::open(dir.path()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("another store holds the lock"), "{msg}");
    assert!(msg.contains(".lock"), "{msg}");
}

#[test]
fn test_lock_released_on_drop() {
    let dir = tempdir().unwrap();
    {
        let _store = Store::builder(AppState::default(), app_reducer)
            .dir(dir.path())
            .open()
            .unwrap();
    }
    let _store = Store::builder(AppState::default(), app_reducer)
        .dir(dir.path())
        .open()
        .unwrap();
}

#[test]
fn test_lock_held_while_clones_alive() {
    let dir = tempdir().unwrap();
    let store = Store::builder(AppState::default(), app_reducer)
        .dir(dir.path())
        .open()
        .unwrap();
    let clone = store.clone();
    drop(store);

    assert!(ActionLog::open(dir.path()).is_err());
    drop(clone);
    assert!(ActionLog::open(dir.path()).is_ok());
}

#[test]
fn test_lock_mode_none_allows_multiple() {
    let dir = tempdir().unwrap();
    let _a = ActionLog::open_with_lock(dir.path(), LockMode::None).unwrap();
    let _b = ActionLog::open_with_lock(dir.path(), LockMode::None).unwrap();
}
