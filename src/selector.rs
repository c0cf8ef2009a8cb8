use crate::path::KeyPath;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Describes how to extract a sub-value of type `T` from a state `S`.
///
/// A selector is either a [`KeyPath`] looked up in the JSON form of the state,
/// or a pure projection function. Projection selectors are checked by the
/// compiler and avoid serializing the state, so prefer them when the shape of
/// `S` is known statically.
///
/// Selectors are cheap to clone and own nothing of the state.
///
/// ```
/// use statefold::Selector;
/// use serde::Serialize;
/// use serde_json::json;
///
/// #[derive(Serialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Counter { current_value: i64 }
///
/// #[derive(Serialize)]
/// struct AppState { counter: Counter }
///
/// let state = AppState { counter: Counter { current_value: 5 } };
///
/// let by_path = Selector::<AppState, _>::path(["counter", "currentValue"]);
/// assert_eq!(by_path.apply(&state), Some(json!(5)));
///
/// let by_fn = Selector::project(|s: &AppState| s.counter.current_value);
/// assert_eq!(by_fn.apply(&state), 5);
/// ```
pub struct Selector<S, T> {
    name: String,
    project: Arc<dyn Fn(&S) -> T + Send + Sync>,
}

impl<S, T> Selector<S, T> {
    /// Build a selector from a projection function over the whole state.
    pub fn project<F>(f: F) -> Self
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        Selector {
            name: "<fn>".to_string(),
            project: Arc::new(f),
        }
    }

    /// Give the selector a name, used in log output and by bindings.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply the selector to a state.
    pub fn apply(&self, state: &S) -> T {
        (self.project)(state)
    }

    /// Compose a further projection on top of this selector.
    pub fn map<U, F>(self, f: F) -> Selector<S, U>
    where
        S: 'static,
        T: 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let inner = self.project;
        Selector {
            name: self.name,
            project: Arc::new(move |state| f(inner(state))),
        }
    }
}

impl<S> Selector<S, Option<Value>>
where
    S: Serialize + 'static,
{
    /// Build a selector that looks `path` up in the JSON form of the state.
    ///
    /// A missing key anywhere along the path selects `None`. If the state
    /// cannot be serialized the selection is also `None` and a warning is
    /// logged.
    pub fn path(path: impl Into<KeyPath>) -> Self {
        let path = path.into();
        let name = path.to_string();
        Selector {
            name,
            project: Arc::new(move |state: &S| match serde_json::to_value(state) {
                Ok(tree) => path.resolve_owned(&tree),
                Err(e) => {
                    log::warn!("statefold: cannot serialize state to select '{path}': {e}");
                    None
                }
            }),
        }
    }
}

impl<S, T> Clone for Selector<S, T> {
    fn clone(&self) -> Self {
        Selector {
            name: self.name.clone(),
            project: Arc::clone(&self.project),
        }
    }
}

impl<S, T> fmt::Debug for Selector<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector").field("name", &self.name).finish()
    }
}
