use std::io;
use std::path::PathBuf;

/// Errors returned by stores, logs and action payload conversion.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Filesystem failure while reading or writing the log, archive or snapshot.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// A payload or state value could not be converted to or from JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A complete line in the action log is not a valid action.
    #[error("corrupt action at byte {offset} of the action log: {source}")]
    Corrupt {
        /// Byte offset where the line starts: within `actions.jsonl` for the
        /// active log, within the decompressed stream for the archive.
        offset: u64,
        #[source]
        source: serde_json::Error,
    },

    /// Another store holds the exclusive lock on the log directory.
    #[error("another store holds the lock on {}", path.display())]
    Locked { path: PathBuf },

    /// The builder was given a combination of options that cannot work.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
