//! Hand-off of finalized paths to the processing pipeline.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::profile::ProfileSnapshot;

/// One finalized file handed to the pipeline.
#[derive(Debug, Clone)]
pub struct DispatchItem {
    /// Absolute path, already relocated when the profile asked for it.
    pub path: PathBuf,
    /// Profile fields resolved at trigger time.
    pub profile: ProfileSnapshot,
}

/// Capability the pipeline exposes to the watch layer.
///
/// Infallible at this layer: delivery and processing problems are the
/// pipeline's concern. A slow implementation stalls only the calling
/// entry's own event loop, never other entries, so implementations that
/// do real work should enqueue rather than process inline.
pub trait DispatchSink: Send + Sync {
    fn dispatch(&self, path: PathBuf, profile: ProfileSnapshot);
}

/// Channel-backed sink feeding a pipeline consumer without blocking.
///
/// Overflow policy belongs to the sink: when the pipeline falls behind the
/// item is dropped and logged, and the entry's event loop moves on.
pub struct ChannelSink {
    tx: mpsc::Sender<DispatchItem>,
}

impl ChannelSink {
    /// Create the sink and the receiving end the pipeline consumes.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DispatchItem>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl DispatchSink for ChannelSink {
    fn dispatch(&self, path: PathBuf, profile: ProfileSnapshot) {
        match self.tx.try_send(DispatchItem { path, profile }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(item)) => {
                tracing::warn!(
                    "[dispatch] pipeline backlog full, dropping {}",
                    item.path.display()
                );
            }
            Err(mpsc::error::TrySendError::Closed(item)) => {
                crate::debug_event!("dispatch", "pipeline gone", "{}", item.path.display());
            }
        }
    }
}
