//! Shared helpers for the integration tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use dropwatch::{DispatchItem, DispatchSink, ProfileSnapshot, WatcherConfig};

/// Sink that records every dispatched item for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    items: Mutex<Vec<DispatchItem>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn items(&self) -> Vec<DispatchItem> {
        self.items.lock().clone()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.items.lock().iter().map(|i| i.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }
}

impl DispatchSink for RecordingSink {
    fn dispatch(&self, path: PathBuf, profile: ProfileSnapshot) {
        self.items.lock().push(DispatchItem { path, profile });
    }
}

/// Fast settle times so tests stay quick without getting flaky.
pub fn test_tuning() -> WatcherConfig {
    WatcherConfig {
        debounce_ms: 200,
        tick_ms: 25,
        channel_capacity: 64,
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
