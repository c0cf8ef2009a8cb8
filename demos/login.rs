//! Persisted login state across restarts.
//!
//! Actions are appended to an action log; reopening the store in the same
//! directory replays them.

use serde::{Deserialize, Serialize};
use serde_json::json;
use statefold::{create_action, Action, Binding, FromStore, Selection, Store};

const LOGIN_SEND: &str = "LOGIN_SEND";
const LOGIN_SUCCESS: &str = "LOGIN_SUCCESS";

#[derive(Default, Clone, Serialize, Deserialize)]
struct Session {
    pending: Option<String>,
    user: Option<String>,
}

fn reducer(mut state: Session, action: &Action) -> Session {
    match action.action_type.as_str() {
        LOGIN_SEND => {
            state.pending = action
                .payload
                .as_ref()
                .and_then(|p| p["username"].as_str())
                .map(str::to_string)
        }
        LOGIN_SUCCESS => state.user = state.pending.take(),
        _ => {}
    }
    state
}

struct Greeting {
    user: Selection<String>,
}

impl Greeting {
    fn user() -> Binding<Session, Option<String>> {
        Binding::project("user", |s: &Session| s.user.clone())
    }
}

impl FromStore<Session> for Greeting {
    fn from_store(store: &Store<Session>) -> Self {
        Greeting {
            user: Self::user().bind(store).present(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    {
        let store = Store::builder(Session::default(), reducer)
            .dir(dir.path())
            .open()?;
        let mut greeting = Greeting::from_store(&store);

        store.dispatch(create_action(LOGIN_SEND, json!({"username": "katie"})))?;
        store.dispatch(Action::new(LOGIN_SUCCESS))?;

        for user in greeting.user.drain() {
            println!("hello, {user}");
        }
    }

    let store = Store::builder(Session::default(), reducer)
        .dir(dir.path())
        .open()?;
    println!(
        "after restart: user = {:?}, {} actions in history",
        store.state().user,
        store.history()?.len()
    );

    Ok(())
}
