//! Debounced per-directory event sources.
//!
//! Raw notifications for a path reset a quiet timer; only when the timer
//! runs out without another notification is the path emitted, once. This
//! keeps half-written files out of the pipeline: editors and copy tools
//! produce long bursts of intermediate write events.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::WatcherConfig;
use crate::error::WatchError;

/// Tracks paths until they have stayed quiet for the configured interval.
///
/// Purely synchronous; the async plumbing around it lives in
/// [`DebouncedEventSource`].
#[derive(Debug)]
pub struct Debouncer {
    /// Pending paths: path -> instant of the last raw notification.
    pending: HashMap<PathBuf, Instant>,
    quiet: Duration,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            quiet,
        }
    }

    /// Record a raw notification, resetting the quiet timer for this path.
    pub fn record(&mut self, path: PathBuf) {
        self.pending.insert(path, Instant::now());
    }

    /// Drop a pending path, e.g. when the file was removed before settling.
    pub fn remove(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    /// Take every path that has been quiet for the full interval.
    pub fn take_settled(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut settled = Vec::new();

        self.pending.retain(|path, last_seen| {
            if now.duration_since(*last_seen) >= self.quiet {
                settled.push(path.clone());
                false
            } else {
                true
            }
        });

        settled
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// One event delivered by a [`DebouncedEventSource`].
#[derive(Debug)]
pub enum SourceEvent {
    /// A file under the watched directory stayed quiet for the full
    /// interval. Emitted once per appearance of the path.
    Settled(PathBuf),
    /// The OS watch died. Terminal: the stream closes after this.
    Lost(WatchError),
}

/// A live OS watch on one directory, feeding settled paths into a channel.
///
/// Constructed running via [`DebouncedEventSource::start`]; a handle is
/// therefore never "started twice". [`stop`](DebouncedEventSource::stop) is
/// idempotent, and dropping the handle stops the watch as well.
pub struct DebouncedEventSource {
    directory: PathBuf,
    inner: Option<SourceInner>,
}

struct SourceInner {
    /// Holds the OS watch registration; dropping it releases the handle and
    /// closes the raw event channel.
    watcher: notify::RecommendedWatcher,
    pump: JoinHandle<()>,
}

impl DebouncedEventSource {
    /// Register a recursive watch on `directory` and begin settling events.
    ///
    /// Returns the source handle and the stream of [`SourceEvent`]s. Fails
    /// when the directory is missing or the OS refuses the watch.
    pub fn start(
        directory: &Path,
        tuning: &WatcherConfig,
    ) -> Result<(Self, mpsc::Receiver<SourceEvent>), WatchError> {
        let (raw_tx, raw_rx) = mpsc::channel::<notify::Result<Event>>(tuning.channel_capacity);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means the source was stopped; nothing to do.
            let _ = raw_tx.blocking_send(res);
        })
        .map_err(|e| WatchError::watch_failed(directory, &e))?;

        watcher
            .watch(directory, RecursiveMode::Recursive)
            .map_err(|e| WatchError::watch_failed(directory, &e))?;

        let (out_tx, out_rx) = mpsc::channel(tuning.channel_capacity);
        let pump = tokio::spawn(pump_events(
            directory.to_path_buf(),
            raw_rx,
            out_tx,
            Duration::from_millis(tuning.debounce_ms),
            Duration::from_millis(tuning.tick_ms),
        ));

        crate::debug_event!("source", "watching", "{}", directory.display());

        Ok((
            Self {
                directory: directory.to_path_buf(),
                inner: Some(SourceInner { watcher, pump }),
            },
            out_rx,
        ))
    }

    /// Release the OS watch handle and stop the settle loop. Idempotent;
    /// paths still pending in the debouncer are dropped, never emitted.
    pub fn stop(&mut self) {
        if let Some(inner) = self.inner.take() {
            drop(inner.watcher);
            inner.pump.abort();
            crate::debug_event!("source", "stopped", "{}", self.directory.display());
        }
    }

    /// Whether an OS watch handle is currently held.
    pub fn is_running(&self) -> bool {
        self.inner.is_some()
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl Drop for DebouncedEventSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Feed raw notify events through the debouncer, emitting settled paths.
async fn pump_events(
    directory: PathBuf,
    mut raw_rx: mpsc::Receiver<notify::Result<Event>>,
    out_tx: mpsc::Sender<SourceEvent>,
    quiet: Duration,
    tick: Duration,
) {
    let mut debouncer = Debouncer::new(quiet);

    loop {
        let timeout = sleep(tick);
        tokio::pin!(timeout);

        tokio::select! {
            res = raw_rx.recv() => match res {
                Some(Ok(event)) => route_event(event, &mut debouncer),
                Some(Err(e)) => {
                    // Watch-handle failure, e.g. the directory was deleted.
                    tracing::error!(
                        "[source] watch lost for {}: {e}",
                        directory.display()
                    );
                    let _ = out_tx
                        .send(SourceEvent::Lost(WatchError::StreamLost {
                            path: directory.clone(),
                            reason: e.to_string(),
                        }))
                        .await;
                    return;
                }
                // Watcher dropped by stop(); end quietly.
                None => return,
            },

            _ = &mut timeout => {
                for path in debouncer.take_settled() {
                    // Skip directories and files that vanished mid-settle.
                    if !path.is_file() {
                        continue;
                    }
                    if out_tx.send(SourceEvent::Settled(path)).await.is_err() {
                        // Consumer gone; stop pumping.
                        return;
                    }
                }
            }
        }
    }
}

fn route_event(event: Event, debouncer: &mut Debouncer) {
    for path in event.paths {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => {
                debouncer.record(path);
            }
            EventKind::Remove(_) => {
                // Superseded before settling; nothing to emit.
                debouncer.remove(&path);
            }
            _ => {}
        }
    }
}
