use crate::action::Action;
use crate::action_log::ActionLog;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::replay::ReduceFn;
use crate::snapshot::{self, Snapshot};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

const SNAPSHOT_FILE: &str = "state.snapshot.json";

/// Persistence side of a store: the action log plus the snapshot that
/// records how much of it has been folded into state.
pub(crate) struct Journal {
    log: ActionLog,
    snapshot_path: PathBuf,
    offset: u64,
    hash: String,
    since_snapshot: u64,
    snapshot_interval: u64,
    max_log_size: u64,
}

enum SnapshotValidity {
    Valid,
    OffsetBeyondEof,
    HashMismatch,
}

impl Journal {
    pub(crate) fn open(dir: &Path, config: &StoreConfig) -> Result<Self> {
        let log = ActionLog::open_with_lock(dir, config.lock)?;
        Ok(Journal {
            snapshot_path: dir.join(SNAPSHOT_FILE),
            log,
            offset: 0,
            hash: String::new(),
            since_snapshot: 0,
            snapshot_interval: config.snapshot_interval,
            max_log_size: config.max_log_size,
        })
    }

    /// Rebuild state from the snapshot and whatever was logged after it,
    /// falling back to a full replay if the snapshot is missing or stale.
    pub(crate) fn recover<S>(&mut self, initial: &S, reducer: ReduceFn<S>) -> Result<(S, u64)>
    where
        S: Serialize + DeserializeOwned + Clone,
    {
        let Some(snap) = snapshot::load::<S>(&self.snapshot_path)? else {
            return self.replay_all(initial, reducer);
        };

        match self.verify(&snap)? {
            SnapshotValidity::Valid => {}
            SnapshotValidity::OffsetBeyondEof => {
                log::warn!(
                    "statefold: snapshot offset {} is beyond end of {}, replaying full history",
                    snap.offset,
                    self.log.log_path().display()
                );
                return self.replay_all(initial, reducer);
            }
            SnapshotValidity::HashMismatch => {
                log::warn!("statefold: snapshot hash mismatch, replaying full history");
                return self.replay_all(initial, reducer);
            }
        }

        let mut state = snap.state;
        let mut revision = snap.revision;
        self.offset = snap.offset;
        self.hash = snap.hash;

        let mut applied = 0u64;
        for result in self.log.read_from(self.offset)? {
            let (action, next_offset, line_hash) = result?;
            state = reducer(state, &action);
            revision += 1;
            self.offset = next_offset;
            self.hash = line_hash;
            applied += 1;
        }

        log::info!(
            "statefold: resumed from snapshot at revision {}, replayed {applied} newer actions",
            revision - applied
        );
        if applied > 0 {
            self.checkpoint(&state, revision)?;
        }
        Ok((state, revision))
    }

    /// Fold the archive and the active log into `initial`.
    pub(crate) fn replay_all<S>(&mut self, initial: &S, reducer: ReduceFn<S>) -> Result<(S, u64)>
    where
        S: Serialize + Clone,
    {
        let mut state = initial.clone();
        let mut revision = 0u64;
        for result in self.log.read_full()? {
            let (action, _) = result?;
            state = reducer(state, &action);
            revision += 1;
        }

        self.offset = self.log.active_log_size()?;
        self.hash = self
            .log
            .read_line_hash_before(self.offset)?
            .unwrap_or_default();

        log::info!("statefold: replayed {revision} actions from full history");
        if revision > 0 {
            self.checkpoint(&state, revision)?;
        }
        Ok((state, revision))
    }

    /// Drop the snapshot and replay everything.
    pub(crate) fn rebuild<S>(&mut self, initial: &S, reducer: ReduceFn<S>) -> Result<(S, u64)>
    where
        S: Serialize + Clone,
    {
        snapshot::delete(&self.snapshot_path)?;
        self.since_snapshot = 0;
        self.replay_all(initial, reducer)
    }

    /// Append an action ahead of applying it.
    pub(crate) fn record(&mut self, action: &Action) -> Result<()> {
        let appended = self.log.append(action)?;
        self.offset = appended.end;
        self.hash = appended.hash;
        self.since_snapshot += 1;
        Ok(())
    }

    /// Snapshot and rotate according to the configured thresholds.
    pub(crate) fn after_dispatch<S: Serialize>(&mut self, state: &S, revision: u64) -> Result<()> {
        if self.max_log_size > 0 && self.offset > self.max_log_size {
            return self.rotate(state, revision);
        }
        if self.snapshot_interval > 0 && self.since_snapshot >= self.snapshot_interval {
            self.checkpoint(state, revision)?;
        }
        Ok(())
    }

    pub(crate) fn checkpoint<S: Serialize>(&mut self, state: &S, revision: u64) -> Result<()> {
        snapshot::save(
            &self.snapshot_path,
            &Snapshot::new(state, self.offset, self.hash.clone(), revision),
        )?;
        self.since_snapshot = 0;
        log::debug!(
            "statefold: snapshot at revision {revision}, offset {}",
            self.offset
        );
        Ok(())
    }

    /// Archive the active log, then record a snapshot at offset 0.
    ///
    /// The old snapshot is removed first: its offset means nothing in the
    /// truncated log, and if the new snapshot cannot be written the next
    /// open has to fall back to a full replay.
    pub(crate) fn rotate<S: Serialize>(&mut self, state: &S, revision: u64) -> Result<()> {
        snapshot::discard(&self.snapshot_path)?;
        self.log.rotate()?;
        self.offset = 0;
        self.hash = String::new();
        self.checkpoint(state, revision)
    }

    pub(crate) fn history(&self) -> Result<Vec<Action>> {
        self.log
            .read_full()?
            .map(|r| r.map(|(action, _)| action))
            .collect()
    }

    pub(crate) fn log(&self) -> &ActionLog {
        &self.log
    }

    pub(crate) fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    fn verify<S>(&self, snap: &Snapshot<S>) -> Result<SnapshotValidity> {
        let file_size = self.log.active_log_size()?;

        if snap.offset > file_size {
            return Ok(SnapshotValidity::OffsetBeyondEof);
        }

        match self.log.read_line_hash_before(snap.offset)? {
            Some(hash) if hash == snap.hash => Ok(SnapshotValidity::Valid),
            Some(_) => Ok(SnapshotValidity::HashMismatch),
            None => Ok(SnapshotValidity::Valid),
        }
    }
}
