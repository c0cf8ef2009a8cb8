//! A counter with a typed state tree, selected two ways.
//!
//! The same value is watched through a key path and through a projection
//! function; both selections see the same sequence.

use serde::{Deserialize, Serialize};
use serde_json::json;
use statefold::{create_action, Action, Store};

const COUNTER_INCREMENT: &str = "COUNTER_INCREMENT";
const COUNTER_SET: &str = "COUNTER_SET";

#[derive(Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Counter {
    current_value: i64,
}

#[derive(Default, Clone, Serialize, Deserialize)]
struct AppState {
    counter: Counter,
}

fn reducer(mut state: AppState, action: &Action) -> AppState {
    match action.action_type.as_str() {
        COUNTER_INCREMENT => state.counter.current_value += 1,
        COUNTER_SET => {
            state.counter.current_value = action.payload_as::<i64>().ok().flatten().unwrap_or(0)
        }
        _ => {}
    }
    state
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::new(AppState::default(), reducer);

    let mut by_path = store.select_path(["counter", "currentValue"]).truthy();
    let mut by_fn = store.select_with(|s: &AppState| s.counter.current_value);

    store.dispatch(Action::new(COUNTER_INCREMENT))?;
    store.dispatch(Action::new(COUNTER_INCREMENT))?;
    store.dispatch(create_action(COUNTER_SET, json!(5)))?;

    println!("by path (falsy filtered): {:?}", by_path.drain());
    println!("by function:              {:?}", by_fn.drain());
    println!("revision {}", store.revision());

    Ok(())
}
