use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An immutable record describing one state change.
///
/// Actions are plain data: a type tag plus an optional JSON payload. They are
/// stored one per line in the action log and replayed through the reducer to
/// rebuild state, so nothing that cannot be serialized belongs in them.
///
/// The serialized form is `{"type": ..., "payload": ...}`; `payload` is
/// omitted when absent.
///
/// # Examples
///
/// ```
/// use statefold::{create_action, Action};
/// use serde_json::json;
///
/// let action = create_action("LOGIN_SEND", json!({"username": "katie"}));
/// assert_eq!(action.action_type, "LOGIN_SEND");
/// assert_eq!(action.payload, Some(json!({"username": "katie"})));
///
/// let reset = Action::new("COUNTER_RESET");
/// assert_eq!(reset.payload, None);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct Action {
    /// The action type tag, conventionally an uppercase-snake-case constant
    /// such as `"COUNTER_INCREMENT"`.
    ///
    /// Serialized as `"type"`.
    #[serde(rename = "type")]
    pub action_type: String,

    /// Auxiliary data. Reducers interpret it however they need.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Build an action from a type tag and an optional payload.
///
/// `payload` takes anything convertible into `Option<Value>`: a JSON value or
/// `None`.
///
/// ```
/// use statefold::create_action;
/// use serde_json::{json, Value};
///
/// let a = create_action("COUNTER_INCREMENT", json!(2));
/// assert_eq!(a.payload, Some(json!(2)));
///
/// let b = create_action("COUNTER_RESET", None::<Value>);
/// assert_eq!(b.payload, None);
/// ```
pub fn create_action(action_type: impl Into<String>, payload: impl Into<Option<Value>>) -> Action {
    Action {
        action_type: action_type.into(),
        payload: payload.into(),
    }
}

impl Action {
    /// Create an action without a payload.
    pub fn new(action_type: impl Into<String>) -> Self {
        create_action(action_type, None::<Value>)
    }

    /// Attach a payload, replacing any existing one.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Create an action whose payload is the JSON form of `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if `payload` cannot be
    /// serialized (for example a map with non-string keys).
    ///
    /// ```
    /// use statefold::Action;
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Login { username: String }
    ///
    /// let action = Action::from_payload("LOGIN_SEND", &Login { username: "katie".into() }).unwrap();
    /// assert_eq!(action.payload.unwrap()["username"], "katie");
    /// ```
    pub fn from_payload<P: Serialize + ?Sized>(
        action_type: impl Into<String>,
        payload: &P,
    ) -> Result<Self> {
        Ok(create_action(action_type, serde_json::to_value(payload)?))
    }

    /// Decode the payload into a typed value.
    ///
    /// Returns `Ok(None)` when the action carries no payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the payload does not
    /// have the shape of `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.payload {
            Some(value) => Ok(Some(T::deserialize(value)?)),
            None => Ok(None),
        }
    }

    /// Returns `true` if this action has the given type tag.
    pub fn is(&self, action_type: &str) -> bool {
        self.action_type == action_type
    }
}
