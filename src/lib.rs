//! Typed actions, a single replaceable state tree, and live selectors.
//!
//! Application state lives in one [`Store`]. It changes only when an
//! [`Action`] is dispatched: the store folds the action into the current
//! state with a pure reducer and swaps in the result as a new revision.
//! [`Selector`]s describe a sub-value of the state, by key path or by
//! projection function, and [`Store::select`] turns one into a
//! [`Selection`] stream of that value.
//!
//! Because actions are plain JSON, a store opened with a directory keeps an
//! append-only action log and rebuilds its state by replaying it.

mod action;
mod action_log;
mod archive;
pub mod bind;
mod builder;
mod config;
mod error;
mod journal;
mod path;
mod replay;
mod selection;
mod selector;
pub mod snapshot;
mod store;

pub use action::{create_action, Action};
pub use action_log::{line_hash, ActionLog, Appended, LockMode};
pub use bind::{Binding, FromStore};
pub use builder::StoreBuilder;
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use path::KeyPath;
pub use replay::{replay, replay_until, ReduceFn};
pub use selection::{is_truthy, Selection};
pub use selector::Selector;
pub use snapshot::Snapshot;
pub use store::{State, Store};
