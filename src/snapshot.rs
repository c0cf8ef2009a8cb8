//! Snapshot persistence for store state.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// A persisted checkpoint of a store's state.
///
/// On reopen the store resumes from the snapshot and only replays actions
/// logged after `offset`. The file is plain JSON:
///
/// ```text
/// $ cat state.snapshot.json | jq .
/// {
///   "state": { "counter": { "currentValue": 5 } },
///   "offset": 412,
///   "hash": "a3f2e1b09c4d...",
///   "revision": 7
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Snapshot<S> {
    /// The state at the time of the snapshot.
    pub state: S,

    /// Byte offset into `actions.jsonl` after the last action applied.
    /// Anything in the archive has always been applied already.
    pub offset: u64,

    /// Hex-encoded xxh64 hash of the last action line applied, or empty if
    /// `offset` is 0.
    pub hash: String,

    /// Number of actions applied to reach `state`.
    #[serde(default)]
    pub revision: u64,
}

impl<S> Snapshot<S> {
    pub fn new(state: S, offset: u64, hash: String, revision: u64) -> Self {
        Snapshot {
            state,
            offset,
            hash,
            revision,
        }
    }
}

/// Save a snapshot atomically.
///
/// Writes to a `.tmp` sibling, syncs it, then renames over `path`, so a crash
/// mid-write leaves the previous snapshot intact.
pub fn save<S: Serialize>(path: &Path, snapshot: &Snapshot<S>) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");

    let json = serde_json::to_string_pretty(snapshot)?;

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_data()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load a snapshot.
///
/// Returns `Ok(None)` if the file is missing. A file that does not parse is
/// also treated as missing, which forces a full replay.
pub fn load<S: DeserializeOwned>(path: &Path) -> Result<Option<Snapshot<S>>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str(&contents) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(e) => {
            log::warn!(
                "statefold: ignoring unreadable snapshot {}: {e}",
                path.display()
            );
            Ok(None)
        }
    }
}

/// Delete a snapshot and its `.tmp` sibling. Missing files are not an error.
pub fn delete(path: &Path) -> Result<()> {
    remove_if_exists(path)?;
    remove_if_exists(&path.with_extension("json.tmp"))?;
    Ok(())
}

/// Delete only the snapshot file, leaving any `.tmp` sibling alone.
pub(crate) fn discard(path: &Path) -> Result<()> {
    remove_if_exists(path)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
