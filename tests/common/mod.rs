#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use statefold::{create_action, Action, Store};

pub const COUNTER_INCREMENT: &str = "COUNTER_INCREMENT";
pub const COUNTER_DECREMENT: &str = "COUNTER_DECREMENT";
pub const COUNTER_SET: &str = "COUNTER_SET";
pub const LOGIN_SEND: &str = "LOGIN_SEND";
pub const LOGIN_SUCCESS: &str = "LOGIN_SUCCESS";
pub const LOGOUT: &str = "LOGOUT";

#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterState {
    pub current_value: i64,
}

#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub pending: Option<String>,
    pub user: Option<String>,
}

#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub counter: CounterState,
    pub session: SessionState,
}

pub fn app_reducer(mut state: AppState, action: &Action) -> AppState {
    match action.action_type.as_str() {
        COUNTER_INCREMENT => state.counter.current_value += 1,
        COUNTER_DECREMENT => state.counter.current_value -= 1,
        COUNTER_SET => {
            state.counter.current_value = action.payload_as::<i64>().ok().flatten().unwrap_or(0);
        }
        LOGIN_SEND => {
            state.session.pending = action
                .payload
                .as_ref()
                .and_then(|p| p["username"].as_str())
                .map(str::to_string);
        }
        LOGIN_SUCCESS => {
            state.session.user = state.session.pending.take();
        }
        LOGOUT => state.session = SessionState::default(),
        _ => {}
    }
    state
}

pub fn counter_reducer(state: u64, _action: &Action) -> u64 {
    state + 1
}

/// Reducer over an untyped JSON tree: `SET` writes `payload.value` at the
/// key path in `payload.path`.
pub fn tree_reducer(mut state: Value, action: &Action) -> Value {
    if action.is("SET") {
        let Some(payload) = &action.payload else {
            return state;
        };
        let mut node = &mut state;
        if let Some(keys) = payload["path"].as_array() {
            for key in keys {
                let key = key.as_str().unwrap_or_default();
                node = &mut node[key];
            }
        }
        *node = payload["value"].clone();
    }
    state
}

pub fn set_at(path: &[&str], value: Value) -> Action {
    create_action("SET", json!({"path": path, "value": value}))
}

pub fn increment() -> Action {
    Action::new(COUNTER_INCREMENT)
}

pub fn dispatch_n(store: &Store<AppState>, n: usize) {
    for _ in 0..n {
        store.dispatch(increment()).unwrap();
    }
}
