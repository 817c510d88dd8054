//! Error types for watch management.
//!
//! Failures are always local to one entry: an error enabling or relocating
//! for one watch never propagates to other watches or to the registry's
//! control operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watch lifecycle and trigger processing.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The directory is missing or the OS refused the watch at enable time.
    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    /// Moving a settled file to its relocation target failed. The trigger is
    /// abandoned for this path, not retried; a later filesystem event for
    /// the same path re-triggers naturally.
    #[error("Failed to relocate {path}: {source}")]
    RelocationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS watch handle died while active, e.g. the directory was
    /// deleted out from under it. Terminal for the owning event stream.
    #[error("Watch stream lost for {path}: {reason}")]
    StreamLost { path: PathBuf, reason: String },
}

impl WatchError {
    /// Map a notify error into a watch failure for `path`.
    pub fn watch_failed(path: &std::path::Path, e: &notify::Error) -> Self {
        WatchError::PathWatchFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    }
}
