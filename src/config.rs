use crate::action_log::LockMode;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options for opening a [`Store`](crate::Store).
///
/// Usually set through [`StoreBuilder`](crate::StoreBuilder), but can also
/// be loaded from JSON with [`StoreConfig::from_json`] and handed to
/// [`StoreBuilder::config`](crate::StoreBuilder::config).
///
/// ```
/// use statefold::{LockMode, StoreConfig};
///
/// let config = StoreConfig::from_json(r#"{"dir": "data", "max_log_size": 1048576}"#).unwrap();
/// assert_eq!(config.snapshot_interval, 100);
/// assert_eq!(config.lock, LockMode::Exclusive);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct StoreConfig {
    /// Directory for the action log and snapshot. `None` keeps the store in
    /// memory only.
    pub dir: Option<PathBuf>,

    /// Dispatches between automatic snapshots. `0` writes snapshots only on
    /// [`checkpoint`](crate::Store::checkpoint) and rotation.
    pub snapshot_interval: u64,

    /// Rotate the active log into the archive once it grows past this many
    /// bytes. `0` disables automatic rotation.
    pub max_log_size: u64,

    /// Directory locking for the action log.
    pub lock: LockMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            dir: None,
            snapshot_interval: 100,
            max_log_size: 0,
            lock: LockMode::Exclusive,
        }
    }
}

impl StoreConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.dir.is_none() && self.max_log_size > 0 {
            return Err(Error::InvalidConfig(
                "max_log_size requires a persistence dir".to_string(),
            ));
        }
        Ok(())
    }
}
