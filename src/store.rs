use crate::action::Action;
use crate::action_log::ActionLog;
use crate::builder::StoreBuilder;
use crate::error::Result;
use crate::journal::Journal;
use crate::path::KeyPath;
use crate::replay::ReduceFn;
use crate::selection::{Guard, Selection};
use crate::selector::Selector;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{mpsc, Arc, Weak};

/// Bounds every store state satisfies.
///
/// Implemented automatically for any type that is serializable, cloneable and
/// shareable across threads.
pub trait State: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> State for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

type Subscriber<S> = Box<dyn FnMut(&S) -> bool + Send>;

struct Subscribers<S> {
    next_id: u64,
    entries: Vec<(u64, Subscriber<S>)>,
}

impl<S> Subscribers<S> {
    fn insert(&mut self, subscriber: Subscriber<S>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, subscriber));
        id
    }

    fn remove(&mut self, id: u64) {
        self.entries.retain(|(entry_id, _)| *entry_id != id);
    }

    /// Deliver `state` to every subscriber in subscription order, dropping
    /// those whose receiving end has gone away.
    fn notify(&mut self, state: &S) {
        self.entries.retain_mut(|(_, subscriber)| subscriber(state));
    }
}

#[derive(Clone)]
struct Revision<S> {
    state: Arc<S>,
    number: u64,
}

struct Inner<S> {
    reducer: ReduceFn<S>,
    initial: Arc<S>,
    current: RwLock<Revision<S>>,
    // Serializes dispatch, checkpoint, rotation and rebuild.
    journal: Mutex<Option<Journal>>,
    subscribers: Arc<Mutex<Subscribers<S>>>,
}

/// The single owner of application state.
///
/// A store holds the current state revision, the reducer that produces the
/// next one, and the live selections watching it. State only changes through
/// [`dispatch`](Store::dispatch), which replaces the whole revision at once;
/// readers holding an earlier `Arc<S>` keep seeing that revision unchanged.
///
/// `Store` is a cheap handle: clones share the same state. Pass it to
/// whatever needs to read, select or dispatch.
///
/// With a persistence directory (see [`Store::builder`]) every action is
/// appended to an action log before it is applied, and reopening the store
/// replays the log to reconstruct the state.
///
/// # Examples
///
/// ```
/// use statefold::{create_action, Action, Store};
/// use serde::{Deserialize, Serialize};
/// use serde_json::{json, Value};
///
/// #[derive(Default, Clone, Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Counter { current_value: i64 }
///
/// #[derive(Default, Clone, Serialize, Deserialize)]
/// struct AppState { counter: Counter }
///
/// fn reducer(mut state: AppState, action: &Action) -> AppState {
///     match action.action_type.as_str() {
///         "COUNTER_INCREMENT" => state.counter.current_value += 1,
///         "COUNTER_SET" => {
///             state.counter.current_value = action.payload_as::<i64>().ok().flatten().unwrap_or(0)
///         }
///         _ => {}
///     }
///     state
/// }
///
/// let store = Store::new(AppState::default(), reducer);
/// let mut value = store.select_path(["counter", "currentValue"]);
/// assert_eq!(value.try_next(), Some(Some(json!(0))));
///
/// store.dispatch(create_action("COUNTER_SET", json!(5))).unwrap();
/// assert_eq!(value.try_next(), Some(Some(json!(5))));
/// assert_eq!(store.state().counter.current_value, 5);
/// ```
pub struct Store<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Store {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: State> Store<S> {
    /// Create an in-memory store.
    pub fn new(initial: S, reducer: ReduceFn<S>) -> Self {
        Self::from_parts(Arc::new(initial.clone()), initial, 0, reducer, None)
    }

    /// Start configuring a store, optionally backed by an action log.
    pub fn builder(initial: S, reducer: ReduceFn<S>) -> StoreBuilder<S> {
        StoreBuilder::new(initial, reducer)
    }

    pub(crate) fn from_parts(
        initial: Arc<S>,
        state: S,
        revision: u64,
        reducer: ReduceFn<S>,
        journal: Option<Journal>,
    ) -> Self {
        Store {
            inner: Arc::new(Inner {
                reducer,
                initial,
                current: RwLock::new(Revision {
                    state: Arc::new(state),
                    number: revision,
                }),
                journal: Mutex::new(journal),
                subscribers: Arc::new(Mutex::new(Subscribers {
                    next_id: 0,
                    entries: Vec::new(),
                })),
            }),
        }
    }

    /// Apply an action and return the new revision number.
    ///
    /// The reducer runs on a clone of the current state; the result replaces
    /// the current revision and is delivered to every selection before this
    /// returns. With persistence, the action is appended to the log first, so
    /// a failed append leaves the state untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if appending the action, writing a scheduled
    /// snapshot, or rotating the log fails. A snapshot or rotation failure
    /// happens after the new state is in place.
    pub fn dispatch(&self, action: Action) -> Result<u64> {
        let mut journal = self.inner.journal.lock();
        if let Some(journal) = journal.as_mut() {
            journal.record(&action)?;
        }

        let prev = self.inner.current.read().clone();
        let next = Revision {
            state: Arc::new((self.inner.reducer)((*prev.state).clone(), &action)),
            number: prev.number + 1,
        };
        log::debug!(
            "statefold: dispatched {} -> revision {}",
            action.action_type,
            next.number
        );
        self.publish(next.clone());

        if let Some(journal) = journal.as_mut() {
            journal.after_dispatch(&*next.state, next.number)?;
        }
        Ok(next.number)
    }

    /// Apply several actions in order. Stops at the first error.
    pub fn dispatch_all<I>(&self, actions: I) -> Result<u64>
    where
        I: IntoIterator<Item = Action>,
    {
        let mut revision = self.revision();
        for action in actions {
            revision = self.dispatch(action)?;
        }
        Ok(revision)
    }

    /// The current state revision.
    pub fn state(&self) -> Arc<S> {
        Arc::clone(&self.inner.current.read().state)
    }

    /// Number of actions applied to reach the current state.
    pub fn revision(&self) -> u64 {
        self.inner.current.read().number
    }

    /// Subscribe to a selector, emitting only when the selected value changes.
    ///
    /// The current value is emitted immediately. After that a value is
    /// emitted for a new revision only if it differs from the last emitted
    /// one.
    pub fn select<T>(&self, selector: Selector<S, T>) -> Selection<T>
    where
        T: PartialEq + Clone + Send + 'static,
    {
        let mut last: Option<T> = None;
        self.subscribe(move |state: &S, tx: &mpsc::Sender<T>| {
            let value = selector.apply(state);
            if last.as_ref() == Some(&value) {
                return true;
            }
            last = Some(value.clone());
            tx.send(value).is_ok()
        })
    }

    /// Subscribe to a selector, emitting once per state revision even when
    /// the selected value is unchanged.
    pub fn select_every<T>(&self, selector: Selector<S, T>) -> Selection<T>
    where
        T: Send + 'static,
    {
        self.subscribe(move |state: &S, tx: &mpsc::Sender<T>| tx.send(selector.apply(state)).is_ok())
    }

    /// Shorthand for `select(Selector::path(path))`.
    pub fn select_path(&self, path: impl Into<KeyPath>) -> Selection<Option<Value>> {
        self.select(Selector::path(path))
    }

    /// Shorthand for `select(Selector::project(f))`.
    pub fn select_with<T, F>(&self, f: F) -> Selection<T>
    where
        T: PartialEq + Clone + Send + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        self.select(Selector::project(f))
    }

    /// Number of live selections.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().entries.len()
    }

    /// Write a snapshot of the current state now. No-op for an in-memory store.
    pub fn checkpoint(&self) -> Result<()> {
        let mut journal = self.inner.journal.lock();
        if let Some(journal) = journal.as_mut() {
            let current = self.inner.current.read().clone();
            journal.checkpoint(&*current.state, current.number)?;
        }
        Ok(())
    }

    /// Move the active action log into the compressed archive.
    /// No-op for an in-memory store.
    pub fn rotate(&self) -> Result<()> {
        let mut journal = self.inner.journal.lock();
        if let Some(journal) = journal.as_mut() {
            let current = self.inner.current.read().clone();
            journal.rotate(&*current.state, current.number)?;
        }
        Ok(())
    }

    /// Discard the snapshot and rebuild state by replaying the whole action
    /// history from the initial state. Selections observe the rebuilt state.
    /// No-op for an in-memory store.
    pub fn rebuild(&self) -> Result<u64> {
        let mut journal = self.inner.journal.lock();
        let Some(journal) = journal.as_mut() else {
            return Ok(self.revision());
        };
        let (state, number) = journal.rebuild(&*self.inner.initial, self.inner.reducer)?;
        self.publish(Revision {
            state: Arc::new(state),
            number,
        });
        Ok(number)
    }

    /// Every persisted action, oldest first. Empty for an in-memory store.
    pub fn history(&self) -> Result<Vec<Action>> {
        match self.inner.journal.lock().as_ref() {
            Some(journal) => journal.history(),
            None => Ok(Vec::new()),
        }
    }

    /// Whether this store writes an action log.
    pub fn is_persistent(&self) -> bool {
        self.inner.journal.lock().is_some()
    }

    /// Run `f` with the underlying action log, if any.
    pub fn with_log<R>(&self, f: impl FnOnce(&ActionLog) -> R) -> Option<R> {
        self.inner.journal.lock().as_ref().map(|j| f(j.log()))
    }

    /// Path of the snapshot file, if the store is persistent.
    pub fn snapshot_path(&self) -> Option<std::path::PathBuf> {
        self.inner
            .journal
            .lock()
            .as_ref()
            .map(|j| j.snapshot_path().to_path_buf())
    }

    /// Swap in a new revision and notify subscribers.
    ///
    /// The subscriber lock is held across the swap so a selection created
    /// concurrently sees either the old revision followed by this one, or
    /// this one first, never a gap.
    fn publish(&self, next: Revision<S>) {
        let mut subscribers = self.inner.subscribers.lock();
        *self.inner.current.write() = next.clone();
        subscribers.notify(&next.state);
    }

    fn subscribe<T, F>(&self, mut deliver: F) -> Selection<T>
    where
        T: Send + 'static,
        F: FnMut(&S, &mpsc::Sender<T>) -> bool + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let mut subscribers = self.inner.subscribers.lock();

        let current = self.state();
        deliver(&*current, &tx);
        let id = subscribers.insert(Box::new(move |state: &S| deliver(state, &tx)));
        drop(subscribers);

        let registry: Weak<Mutex<Subscribers<S>>> = Arc::downgrade(&self.inner.subscribers);
        let guard = Guard::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.lock().remove(id);
            }
        });
        Selection::from_channel(rx, guard)
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.inner.current.read();
        f.debug_struct("Store")
            .field("state", &current.state)
            .field("revision", &current.number)
            .finish()
    }
}
