use crate::action::Action;
use std::borrow::Borrow;

/// A pure function that folds an action into state.
///
/// Reducers receive owned state and return the next state. They must be
/// pure (no I/O, no clock, no randomness) so that replaying the action log
/// reproduces the same state, and they should pass unknown action types
/// through unchanged with a `_ => {}` arm.
///
/// # Examples
///
/// ```
/// use statefold::{Action, ReduceFn};
///
/// fn counter(state: i64, action: &Action) -> i64 {
///     match action.action_type.as_str() {
///         "COUNTER_INCREMENT" => state + 1,
///         "COUNTER_DECREMENT" => state - 1,
///         _ => state,
///     }
/// }
///
/// let reducer: ReduceFn<i64> = counter;
/// ```
pub type ReduceFn<S> = fn(S, &Action) -> S;

/// Fold `actions` into `initial` with `reducer`.
///
/// ```
/// use statefold::{replay, Action};
///
/// fn count(state: u32, _: &Action) -> u32 { state + 1 }
///
/// let actions = vec![Action::new("A"), Action::new("B")];
/// assert_eq!(replay(0, count, &actions), 2);
/// ```
pub fn replay<S, I>(initial: S, reducer: ReduceFn<S>, actions: I) -> S
where
    I: IntoIterator,
    I::Item: Borrow<Action>,
{
    actions
        .into_iter()
        .fold(initial, |state, action| reducer(state, action.borrow()))
}

/// Fold at most the first `limit` actions. Stopping early gives the state as
/// it was at that point in the history.
pub fn replay_until<S, I>(initial: S, reducer: ReduceFn<S>, actions: I, limit: usize) -> S
where
    I: IntoIterator,
    I::Item: Borrow<Action>,
{
    replay(initial, reducer, actions.into_iter().take(limit))
}
