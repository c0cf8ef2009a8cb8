use serde_json::Value;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

/// The receiving end of a store subscription.
///
/// A `Selection` yields the selected value once when it is created and then
/// again after state transitions, in the order the store applied them. It is
/// a blocking [`Iterator`]: `next()` waits for the next value and returns
/// `None` once every handle to the store has been dropped. Use
/// [`try_next`](Selection::try_next) or
/// [`next_timeout`](Selection::next_timeout) to avoid blocking.
///
/// Filter stages are attached by value and return a new `Selection`:
///
/// ```
/// use statefold::{create_action, Action, Store};
/// use serde_json::{json, Value};
///
/// fn reducer(mut state: Value, action: &Action) -> Value {
///     if action.is("LOGIN_SUCCESS") {
///         state["user"] = action.payload.clone().unwrap_or(Value::Null);
///     }
///     state
/// }
///
/// let store = Store::new(json!({}), reducer);
/// let mut user = store.select_path("user").present();
///
/// assert_eq!(user.try_next(), None);
/// store.dispatch(create_action("LOGIN_SUCCESS", json!({"name": "katie"}))).unwrap();
/// assert_eq!(user.try_next(), Some(json!({"name": "katie"})));
/// ```
///
/// Dropping a `Selection` unsubscribes it.
///
/// Values queue up without bound until they are read; the store never waits
/// for a slow reader. A selection that is only consulted now and then should
/// be read with [`latest`](Selection::latest) or [`drain`](Selection::drain)
/// so old revisions do not pile up.
pub struct Selection<T> {
    source: Box<dyn Source<T> + Send>,
}

#[derive(Clone, Copy)]
enum Wait {
    Block,
    Poll,
    Until(Instant),
}

enum Pull<T> {
    Item(T),
    Empty,
    Closed,
}

trait Source<T> {
    fn pull(&mut self, wait: Wait) -> Pull<T>;
}

/// Runs a cleanup action when dropped.
pub(crate) struct Guard(Option<Box<dyn FnOnce() + Send>>);

impl Guard {
    pub(crate) fn new(on_drop: impl FnOnce() + Send + 'static) -> Self {
        Guard(Some(Box::new(on_drop)))
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        if let Some(on_drop) = self.0.take() {
            on_drop();
        }
    }
}

struct Channel<T> {
    rx: Receiver<T>,
    _guard: Guard,
}

impl<T> Source<T> for Channel<T> {
    fn pull(&mut self, wait: Wait) -> Pull<T> {
        match wait {
            Wait::Block => match self.rx.recv() {
                Ok(v) => Pull::Item(v),
                Err(_) => Pull::Closed,
            },
            Wait::Poll => match self.rx.try_recv() {
                Ok(v) => Pull::Item(v),
                Err(TryRecvError::Empty) => Pull::Empty,
                Err(TryRecvError::Disconnected) => Pull::Closed,
            },
            Wait::Until(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match self.rx.recv_timeout(timeout) {
                    Ok(v) => Pull::Item(v),
                    Err(RecvTimeoutError::Timeout) => Pull::Empty,
                    Err(RecvTimeoutError::Disconnected) => Pull::Closed,
                }
            }
        }
    }
}

struct Stage<T, U> {
    inner: Box<dyn Source<T> + Send>,
    f: Box<dyn FnMut(T) -> Option<U> + Send>,
}

impl<T, U> Source<U> for Stage<T, U> {
    fn pull(&mut self, wait: Wait) -> Pull<U> {
        loop {
            match self.inner.pull(wait) {
                Pull::Item(v) => {
                    if let Some(out) = (self.f)(v) {
                        return Pull::Item(out);
                    }
                }
                Pull::Empty => return Pull::Empty,
                Pull::Closed => return Pull::Closed,
            }
        }
    }
}

impl<T: Send + 'static> Selection<T> {
    pub(crate) fn from_channel(rx: Receiver<T>, guard: Guard) -> Self {
        Selection {
            source: Box::new(Channel { rx, _guard: guard }),
        }
    }

    fn stage<U, F>(self, f: F) -> Selection<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static,
    {
        Selection {
            source: Box::new(Stage {
                inner: self.source,
                f: Box::new(f),
            }),
        }
    }

    /// Suppress values for which `pred` returns `false`.
    pub fn filter<P>(self, mut pred: P) -> Selection<T>
    where
        P: FnMut(&T) -> bool + Send + 'static,
    {
        self.stage(move |v| if pred(&v) { Some(v) } else { None })
    }

    /// Transform every value.
    pub fn map<U, F>(self, mut f: F) -> Selection<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        self.stage(move |v| Some(f(v)))
    }

    /// Transform values, suppressing those mapped to `None`.
    pub fn filter_map<U, F>(self, f: F) -> Selection<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static,
    {
        self.stage(f)
    }

    /// Return the next value if one is already queued.
    pub fn try_next(&mut self) -> Option<T> {
        match self.source.pull(Wait::Poll) {
            Pull::Item(v) => Some(v),
            Pull::Empty | Pull::Closed => None,
        }
    }

    /// Wait up to `timeout` for the next value.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<T> {
        match self.source.pull(Wait::Until(Instant::now() + timeout)) {
            Pull::Item(v) => Some(v),
            Pull::Empty | Pull::Closed => None,
        }
    }

    /// Take every value that is already queued, without blocking.
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Discard queued values and return the most recent one, if any.
    pub fn latest(&mut self) -> Option<T> {
        self.drain().pop()
    }

    /// Cancel the subscription.
    ///
    /// Equivalent to dropping the selection.
    pub fn unsubscribe(self) {}
}

impl<T: Send + 'static> Selection<Option<T>> {
    /// Suppress absent values and unwrap the present ones.
    pub fn present(self) -> Selection<T> {
        self.stage(|v| v)
    }
}

impl Selection<Option<Value>> {
    /// Suppress absent and falsy values: `null`, `false`, `0`, `""`.
    pub fn truthy(self) -> Selection<Value> {
        self.stage(|v| v.filter(is_truthy))
    }
}

/// Returns `false` for `null`, `false`, numeric zero and the empty string.
///
/// Arrays and objects are truthy even when empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl<T: Send + 'static> Iterator for Selection<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match self.source.pull(Wait::Block) {
            Pull::Item(v) => Some(v),
            Pull::Empty | Pull::Closed => None,
        }
    }
}

impl<T> std::fmt::Debug for Selection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection").finish_non_exhaustive()
    }
}
