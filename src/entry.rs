//! Per-watch lifecycle: one entry owns one debounced source and feeds the
//! dispatch sink.

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::WatcherConfig;
use crate::debounce::{DebouncedEventSource, SourceEvent};
use crate::dispatch::DispatchSink;
use crate::error::WatchError;
use crate::profile::{TaskProfile, WatchConfig};
use crate::relocate;

enum EntryState {
    /// Constructed or disabled: no OS watch handle held, re-enableable.
    Idle,
    /// Live OS watch plus the task draining its settled paths.
    Running {
        source: DebouncedEventSource,
        consumer: JoinHandle<()>,
    },
    /// Detached from its profile. Terminal.
    Disposed,
}

/// Runtime pairing of one config with its profile and event source.
///
/// `enable`, `disable` and `dispose` are idempotent and safe to call
/// concurrently with each other and with event delivery; every transition
/// happens under one mutex. Event processing itself never takes that
/// mutex, so a slow sink cannot block control operations.
pub struct WatchEntry {
    config: Arc<WatchConfig>,
    profile: Arc<TaskProfile>,
    sink: Arc<dyn DispatchSink>,
    tuning: WatcherConfig,
    state: Mutex<EntryState>,
    /// Handed to the consumer task so a dropped entry never lingers
    /// through its own consumer.
    this: Weak<WatchEntry>,
}

impl WatchEntry {
    pub fn new(
        config: Arc<WatchConfig>,
        profile: Arc<TaskProfile>,
        sink: Arc<dyn DispatchSink>,
        tuning: WatcherConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            config,
            profile,
            sink,
            tuning,
            state: Mutex::new(EntryState::Idle),
            this: this.clone(),
        })
    }

    pub fn config(&self) -> &Arc<WatchConfig> {
        &self.config
    }

    pub fn profile(&self) -> &Arc<TaskProfile> {
        &self.profile
    }

    /// Whether a live OS watch handle is currently held.
    pub fn is_enabled(&self) -> bool {
        matches!(*self.state.lock(), EntryState::Running { .. })
    }

    pub fn is_disposed(&self) -> bool {
        matches!(*self.state.lock(), EntryState::Disposed)
    }

    /// Start the event source and begin consuming its stream.
    ///
    /// No-op when already enabled or disposed. Fails with
    /// [`WatchError::PathWatchFailed`] when the directory is missing or the
    /// OS refuses the watch; the entry stays Idle and can be retried. Must
    /// be called within a tokio runtime.
    pub fn enable(&self) -> Result<(), WatchError> {
        let mut state = self.state.lock();
        match *state {
            EntryState::Running { .. } | EntryState::Disposed => return Ok(()),
            EntryState::Idle => {}
        }

        let (source, events) = DebouncedEventSource::start(&self.config.directory, &self.tuning)?;
        let consumer = tokio::spawn(consume(events, self.this.clone()));
        *state = EntryState::Running { source, consumer };

        crate::log_event!("watch", "enabled", "{}", self.config.directory.display());
        Ok(())
    }

    /// Release the OS watch handle but keep the entry tracked and
    /// re-enableable. Idempotent. Paths still settling are dropped.
    pub fn disable(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, EntryState::Running { .. }) {
            return;
        }
        if let EntryState::Running {
            mut source,
            consumer,
        } = std::mem::replace(&mut *state, EntryState::Idle)
        {
            source.stop();
            consumer.abort();
            crate::log_event!("watch", "disabled", "{}", self.config.directory.display());
        }
    }

    /// Disable and detach this config from its profile's config list.
    /// Terminal and idempotent; never errors, even when already disposed.
    pub fn dispose(&self) {
        {
            let mut state = self.state.lock();
            if matches!(*state, EntryState::Disposed) {
                return;
            }
            if let EntryState::Running {
                mut source,
                consumer,
            } = std::mem::replace(&mut *state, EntryState::Disposed)
            {
                source.stop();
                consumer.abort();
            }
        }
        self.profile.remove_config(&self.config);
        crate::debug_event!("watch", "disposed", "{}", self.config.directory.display());
    }

    /// The event stream died underneath a running entry: drop the dead
    /// handle and fall back to Idle so the entry can be re-enabled.
    fn mark_stream_lost(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, EntryState::Running { .. }) {
            return;
        }
        if let EntryState::Running { mut source, .. } =
            std::mem::replace(&mut *state, EntryState::Idle)
        {
            source.stop();
        }
    }
}

/// Drain one entry's settled paths until the stream ends.
///
/// Holds only a weak reference so a dropped entry never lingers through its
/// own consumer task. Processing of a received path is fully synchronous,
/// so a disposal racing in mid-relocation or mid-dispatch lets the current
/// path finish; only paths not yet received are dropped.
async fn consume(mut events: mpsc::Receiver<SourceEvent>, entry: Weak<WatchEntry>) {
    while let Some(event) = events.recv().await {
        let Some(entry) = entry.upgrade() else {
            return;
        };
        match event {
            SourceEvent::Settled(path) => {
                handle_settled(path, &entry);
            }
            SourceEvent::Lost(e) => {
                tracing::error!(
                    "[watch] stream lost for {}, disabling: {e}",
                    entry.config.directory.display()
                );
                entry.mark_stream_lost();
                return;
            }
        }
    }
}

/// Relocate (when the profile asks for it) and dispatch one settled path.
fn handle_settled(path: PathBuf, entry: &WatchEntry) {
    // Flags may have changed since the entry was built; read them fresh.
    let snapshot = entry.profile.snapshot(&entry.config);

    // The owner may flip the profile off without going through the
    // registry; a trigger arriving after that is abandoned.
    if !snapshot.enabled {
        crate::debug_event!(
            "watch",
            "trigger abandoned, profile disabled",
            "{}",
            path.display()
        );
        return;
    }

    let final_path = if snapshot.relocate {
        match &snapshot.target {
            Some(target) => match relocate::move_into(&path, &target.directory) {
                Ok(moved) => moved,
                Err(e) => {
                    // Abandon this trigger; a later event re-triggers naturally.
                    tracing::warn!("[watch] relocation abandoned: {e}");
                    return;
                }
            },
            None => {
                crate::debug_event!(
                    "watch",
                    "relocation requested without target",
                    "{}",
                    path.display()
                );
                path
            }
        }
    } else {
        path
    };

    crate::log_event!("watch", "dispatch", "{}", final_path.display());
    entry.sink.dispatch(final_path, snapshot);
}
