use crate::action_log::LockMode;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::journal::Journal;
use crate::replay::ReduceFn;
use crate::store::{State, Store};
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for a [`Store`].
///
/// Without [`dir`](StoreBuilder::dir) the store is in-memory. With it, the
/// store appends every action to `<dir>/actions.jsonl` and on open resumes
/// from the latest snapshot plus any newer actions.
///
/// # Examples
///
/// ```
/// use statefold::{Action, Store};
///
/// fn count(state: u64, _: &Action) -> u64 { state + 1 }
///
/// let dir = tempfile::tempdir().unwrap();
/// {
///     let store = Store::builder(0u64, count).dir(dir.path()).open().unwrap();
///     store.dispatch(Action::new("TICK")).unwrap();
///     store.dispatch(Action::new("TICK")).unwrap();
/// }
///
/// let store = Store::builder(0u64, count).dir(dir.path()).open().unwrap();
/// assert_eq!(*store.state(), 2);
/// ```
pub struct StoreBuilder<S> {
    initial: S,
    reducer: ReduceFn<S>,
    config: StoreConfig,
}

impl<S: State> StoreBuilder<S> {
    pub fn new(initial: S, reducer: ReduceFn<S>) -> Self {
        StoreBuilder {
            initial,
            reducer,
            config: StoreConfig::default(),
        }
    }

    /// Replace every option with `config`.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Persist actions and snapshots under `dir`.
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dir = Some(dir.into());
        self
    }

    /// Dispatches between automatic snapshots. `0` disables them.
    pub fn snapshot_interval(mut self, interval: u64) -> Self {
        self.config.snapshot_interval = interval;
        self
    }

    /// Rotate the active log once it exceeds `bytes`. `0` disables rotation.
    pub fn max_log_size(mut self, bytes: u64) -> Self {
        self.config.max_log_size = bytes;
        self
    }

    pub fn lock_mode(mut self, mode: LockMode) -> Self {
        self.config.lock = mode;
        self
    }

    /// Open the store, replaying persisted actions if a directory is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) for
    /// inconsistent options, [`Error::Locked`](crate::Error::Locked) if
    /// another store owns the directory, and I/O or corruption errors from
    /// reading the log.
    pub fn open(self) -> Result<Store<S>> {
        self.config.validate()?;
        let initial = Arc::new(self.initial);

        let Some(dir) = self.config.dir.as_deref() else {
            let state = (*initial).clone();
            return Ok(Store::from_parts(initial, state, 0, self.reducer, None));
        };

        let mut journal = Journal::open(dir, &self.config)?;
        let (state, revision) = journal.recover(&*initial, self.reducer)?;
        log::debug!(
            "statefold: opened store in {} at revision {revision}",
            dir.display()
        );
        Ok(Store::from_parts(
            initial,
            state,
            revision,
            self.reducer,
            Some(journal),
        ))
    }
}
