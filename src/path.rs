use serde_json::Value;
use std::fmt;

/// An ordered sequence of keys applied as successive lookups into a JSON tree.
///
/// A key indexes an object by property name. On an array, a key that parses
/// as a non-negative integer indexes by position. Any missing step makes the
/// whole path resolve to `None`.
///
/// Built from a single key or from a sequence of keys:
///
/// ```
/// use statefold::KeyPath;
/// use serde_json::json;
///
/// let state = json!({"counter": {"currentValue": 5}});
///
/// let path = KeyPath::from(["counter", "currentValue"]);
/// assert_eq!(path.resolve(&state), Some(&json!(5)));
///
/// assert_eq!(KeyPath::from("counter").resolve(&state), Some(&json!({"currentValue": 5})));
/// assert_eq!(KeyPath::from(["missing", "x"]).resolve(&state), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyPath {
    keys: Vec<String>,
}

impl KeyPath {
    /// An empty path resolves to the whole tree.
    pub fn root() -> Self {
        KeyPath { keys: Vec::new() }
    }

    /// Extend the path by one key.
    pub fn join(mut self, key: impl Into<String>) -> Self {
        self.keys.push(key.into());
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_root(&self) -> bool {
        self.keys.is_empty()
    }

    /// Resolve the path against `tree`, borrowing the selected node.
    pub fn resolve<'a>(&self, tree: &'a Value) -> Option<&'a Value> {
        self.keys.iter().try_fold(tree, |node, key| step(node, key))
    }

    /// Resolve the path and clone the selected node.
    pub fn resolve_owned(&self, tree: &Value) -> Option<Value> {
        self.resolve(tree).cloned()
    }
}

fn step<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.keys.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.keys.join("."))
    }
}

impl From<&str> for KeyPath {
    fn from(key: &str) -> Self {
        KeyPath::root().join(key)
    }
}

impl From<String> for KeyPath {
    fn from(key: String) -> Self {
        KeyPath::root().join(key)
    }
}

impl<const N: usize> From<[&str; N]> for KeyPath {
    fn from(keys: [&str; N]) -> Self {
        keys.as_slice().into()
    }
}

impl From<&[&str]> for KeyPath {
    fn from(keys: &[&str]) -> Self {
        KeyPath {
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl From<Vec<&str>> for KeyPath {
    fn from(keys: Vec<&str>) -> Self {
        keys.as_slice().into()
    }
}

impl From<Vec<String>> for KeyPath {
    fn from(keys: Vec<String>) -> Self {
        KeyPath { keys }
    }
}

impl FromIterator<String> for KeyPath {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        KeyPath {
            keys: iter.into_iter().collect(),
        }
    }
}
