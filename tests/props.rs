mod common;

use common::{app_reducer, tree_reducer, AppState, COUNTER_DECREMENT, COUNTER_INCREMENT, COUNTER_SET};
use proptest::prelude::*;
use serde_json::{json, Value};
use statefold::{create_action, replay, replay_until, Action, KeyPath, Selector, Store};
use tempfile::tempdir;

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("counter".to_string()),
        Just("currentValue".to_string()),
        Just("session".to_string()),
        Just("user".to_string()),
    ]
}

fn arb_tree() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z]{0,6}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        proptest::collection::btree_map(arb_key(), inner, 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    })
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::new(COUNTER_INCREMENT)),
        Just(Action::new(COUNTER_DECREMENT)),
        (-100i64..100).prop_map(|n| create_action(COUNTER_SET, json!(n))),
        Just(Action::new("IGNORED")),
    ]
}

fn arb_actions() -> impl Strategy<Value = Vec<Action>> {
    proptest::collection::vec(arb_action(), 0..40)
}

fn index(tree: &Value, keys: &[String]) -> Option<Value> {
    let mut node = tree;
    for key in keys {
        node = node.as_object()?.get(key)?;
    }
    Some(node.clone())
}

proptest! {
    // Selecting a key path equals indexing the tree key by key.
    #[test]
    fn prop_path_matches_indexing(tree in arb_tree(), keys in proptest::collection::vec(arb_key(), 0..4)) {
        let selector = Selector::<Value, _>::path(KeyPath::from(keys.clone()));
        prop_assert_eq!(selector.apply(&tree), index(&tree, &keys));
    }

    // A projection selector yields exactly f(S).
    #[test]
    fn prop_projection_is_applied_directly(tree in arb_tree()) {
        let f = |s: &Value| s.as_object().map(|m| m.len()).unwrap_or(0);
        let store = Store::new(tree.clone(), tree_reducer);
        let mut sel = store.select_with(f);
        prop_assert_eq!(sel.try_next(), Some(f(&tree)));
    }

    // Dispatching into a store gives the same state as folding manually.
    #[test]
    fn prop_dispatch_equals_replay(actions in arb_actions()) {
        let store = Store::new(AppState::default(), app_reducer);
        for action in &actions {
            store.dispatch(action.clone()).unwrap();
        }
        let folded = replay(AppState::default(), app_reducer, &actions);
        prop_assert_eq!(&*store.state(), &folded);
        prop_assert_eq!(store.revision(), actions.len() as u64);
    }

    // Stopping replay early reproduces the state a subscriber saw at that revision.
    #[test]
    fn prop_replay_until_matches_revision(actions in arb_actions()) {
        let store = Store::new(AppState::default(), app_reducer);
        let mut every = store.select_every(Selector::project(|s: &AppState| s.clone()));
        for action in &actions {
            store.dispatch(action.clone()).unwrap();
        }
        for (n, seen) in every.drain().into_iter().enumerate() {
            prop_assert_eq!(seen, replay_until(AppState::default(), app_reducer, &actions, n));
        }
    }

    // Reopening a persisted store reconstructs the live state, whatever
    // mix of snapshots and rotations happened on the way.
    #[test]
    fn prop_reopen_reconstructs_state(
        actions in arb_actions(),
        snapshot_interval in 0u64..5,
        rotation_points in proptest::collection::vec(0..40usize, 0..4),
    ) {
        let dir = tempdir().unwrap();
        let live = {
            let store = Store::builder(AppState::default(), app_reducer)
                .dir(dir.path())
                .snapshot_interval(snapshot_interval)
                .open()
                .unwrap();
            for (i, action) in actions.iter().enumerate() {
                store.dispatch(action.clone()).unwrap();
                if rotation_points.contains(&i) {
                    store.rotate().unwrap();
                }
            }
            (*store.state()).clone()
        };

        let store = Store::builder(AppState::default(), app_reducer)
            .dir(dir.path())
            .open()
            .unwrap();
        prop_assert_eq!(&*store.state(), &live);
        prop_assert_eq!(store.revision(), actions.len() as u64);
        prop_assert_eq!(store.history().unwrap(), actions);
    }
}
