//! Replaying the action history to any point.

use serde_json::json;
use statefold::{create_action, replay_until, Action, Store};

fn reducer(state: i64, action: &Action) -> i64 {
    match action.action_type.as_str() {
        "ADD" => state + action.payload_as::<i64>().ok().flatten().unwrap_or(0),
        _ => state,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = Store::builder(0i64, reducer).dir(dir.path()).open()?;

    for i in 1..=20 {
        store.dispatch(create_action("ADD", json!(i)))?;
    }
    store.rotate()?;

    let history = store.history()?;
    println!("full state ({} actions): {}", history.len(), store.state());
    for n in [5, 10, 15] {
        println!("state at action {n}: {}", replay_until(0, reducer, &history, n));
    }

    Ok(())
}
