//! The watch manager: a tracked set of entries keyed by config identity.
//!
//! All mutation of the watch set goes through the registry. Event delivery
//! never touches the tracked map, so control operations and event callbacks
//! do not contend.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::WatcherConfig;
use crate::dispatch::DispatchSink;
use crate::entry::WatchEntry;
use crate::error::WatchError;
use crate::profile::{ConfigId, TaskProfile, WatchConfig};

/// Owns the collection of [`WatchEntry`] instances.
///
/// Exactly one live entry exists per distinct config; disposal and removal
/// from the tracked set always happen together, so no dangling OS watch
/// handle can survive a control operation.
pub struct WatchRegistry {
    sink: Arc<dyn DispatchSink>,
    tuning: WatcherConfig,
    entries: Mutex<HashMap<ConfigId, Arc<WatchEntry>>>,
}

impl WatchRegistry {
    pub fn new(sink: Arc<dyn DispatchSink>) -> Self {
        Self::with_config(sink, WatcherConfig::default())
    }

    pub fn with_config(sink: Arc<dyn DispatchSink>, tuning: WatcherConfig) -> Self {
        Self {
            sink,
            tuning,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Bring the tracked set in line with `desired`.
    ///
    /// Entries whose config is absent from `desired` are disposed and
    /// dropped; new pairs are added; entries present in both are left
    /// running untouched, so their OS watch never gaps across a settings
    /// update. Per-entry enable failures are collected and returned; they
    /// never abort the rest of the reconcile.
    pub fn reconcile(&self, desired: &[(Arc<WatchConfig>, Arc<TaskProfile>)]) -> Vec<WatchError> {
        let keep: HashSet<ConfigId> = desired.iter().map(|(c, _)| ConfigId::of(c)).collect();

        {
            let mut entries = self.entries.lock();
            entries.retain(|id, entry| {
                if keep.contains(id) {
                    true
                } else {
                    entry.dispose();
                    false
                }
            });
        }

        let mut errors = Vec::new();
        for (config, profile) in desired {
            if let Err(e) = self.add_watch(config, profile) {
                errors.push(e);
            }
        }

        crate::debug_event!("registry", "reconciled", "{} tracked", self.len());
        errors
    }

    /// Track `config` and enable it when its profile is enabled right now.
    ///
    /// Adding a config that is already tracked is a silent no-op: no second
    /// entry, no duplicate registration in the profile's config list.
    pub fn add_watch(
        &self,
        config: &Arc<WatchConfig>,
        profile: &Arc<TaskProfile>,
    ) -> Result<(), WatchError> {
        let entry = {
            let mut entries = self.entries.lock();
            let id = ConfigId::of(config);
            if entries.contains_key(&id) {
                return Ok(());
            }

            let entry = WatchEntry::new(
                Arc::clone(config),
                Arc::clone(profile),
                Arc::clone(&self.sink),
                self.tuning.clone(),
            );
            profile.ensure_config(config);
            entries.insert(id, Arc::clone(&entry));
            entry
        };

        // Enable outside the map lock; a failed enable leaves the entry
        // tracked but idle so set_enabled can retry it later.
        if profile.is_enabled() {
            entry.enable()?;
        }
        Ok(())
    }

    /// Dispose and drop the entry for `config`. Absence is a no-op.
    pub fn remove_watch(&self, config: &Arc<WatchConfig>) {
        let entry = self.entries.lock().remove(&ConfigId::of(config));
        if let Some(entry) = entry {
            // Dispose also detaches the config from its profile's list.
            entry.dispose();
        }
    }

    /// Apply the profile's enabled flag, read at call time, to the entry:
    /// enabled starts the watch, disabled fully releases the OS handle
    /// while keeping the entry tracked. Unknown configs are a no-op.
    pub fn set_enabled(&self, config: &Arc<WatchConfig>) -> Result<(), WatchError> {
        let entry = self.entries.lock().get(&ConfigId::of(config)).cloned();
        let Some(entry) = entry else {
            return Ok(());
        };

        if entry.profile().is_enabled() {
            entry.enable()
        } else {
            entry.disable();
            Ok(())
        }
    }

    /// Dispose every tracked entry. Safe on an empty registry and safe to
    /// call repeatedly; never errors.
    pub fn shutdown_all(&self) {
        let mut entries = self.entries.lock();
        for entry in entries.values() {
            entry.dispose();
        }
        entries.clear();
        crate::log_event!("registry", "shutdown");
    }

    /// Look up the live entry for `config`, by identity.
    pub fn entry(&self, config: &Arc<WatchConfig>) -> Option<Arc<WatchEntry>> {
        self.entries.lock().get(&ConfigId::of(config)).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
