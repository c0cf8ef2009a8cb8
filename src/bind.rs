//! Named selector bindings.
//!
//! A [`Binding`] is a selector with a field name, declared once (usually as a
//! constructor function next to the component that uses it) and bound to a
//! store when the component is built. [`FromStore`] is the construction hook.
//!
//! ```
//! use statefold::{Action, Binding, FromStore, Selection, Store};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Clone, Serialize, Deserialize)]
//! struct AppState { count: i64 }
//!
//! fn reducer(mut state: AppState, action: &Action) -> AppState {
//!     if action.is("COUNTER_INCREMENT") { state.count += 1; }
//!     state
//! }
//!
//! struct CounterView {
//!     count: Selection<i64>,
//! }
//!
//! impl CounterView {
//!     fn count() -> Binding<AppState, i64> {
//!         Binding::project("count", |s: &AppState| s.count)
//!     }
//! }
//!
//! impl FromStore<AppState> for CounterView {
//!     fn from_store(store: &Store<AppState>) -> Self {
//!         CounterView { count: Self::count().bind(store) }
//!     }
//! }
//!
//! let store = Store::new(AppState::default(), reducer);
//! let mut view = CounterView::from_store(&store);
//! store.dispatch(Action::new("COUNTER_INCREMENT")).unwrap();
//! assert_eq!(view.count.drain(), vec![0, 1]);
//! ```

use crate::path::KeyPath;
use crate::selection::Selection;
use crate::selector::Selector;
use crate::store::{State, Store};
use serde::Serialize;
use serde_json::Value;

/// A named, reusable selector ready to be bound to a store.
pub struct Binding<S, T> {
    selector: Selector<S, T>,
}

impl<S, T> Binding<S, T> {
    /// Bind a field to a projection of the whole state.
    pub fn project<F>(name: &str, f: F) -> Self
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        Binding {
            selector: Selector::project(f).named(name),
        }
    }

    /// Bind a field to an existing selector.
    pub fn from_selector(name: &str, selector: Selector<S, T>) -> Self {
        Binding {
            selector: selector.named(name),
        }
    }

    pub fn name(&self) -> &str {
        self.selector.name()
    }

    pub fn selector(&self) -> &Selector<S, T> {
        &self.selector
    }
}

impl<S: Serialize + 'static> Binding<S, Option<Value>> {
    /// Bind a field to a key path into the state.
    pub fn path(name: &str, path: impl Into<KeyPath>) -> Self {
        Binding::from_selector(name, Selector::path(path))
    }
}

impl<S: State, T: PartialEq + Clone + Send + 'static> Binding<S, T> {
    /// Subscribe to `store`, emitting the current value and every change.
    pub fn bind(&self, store: &Store<S>) -> Selection<T> {
        log::debug!("statefold: binding '{}'", self.name());
        store.select(self.selector.clone())
    }
}

impl<S, T> Clone for Binding<S, T> {
    fn clone(&self) -> Self {
        Binding {
            selector: self.selector.clone(),
        }
    }
}

/// Types that build themselves from a store, binding their selections at
/// construction time.
pub trait FromStore<S>: Sized {
    fn from_store(store: &Store<S>) -> Self;
}
