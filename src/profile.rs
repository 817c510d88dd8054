//! Watch configuration and task profile data model.
//!
//! A `WatchConfig` is identified by the address of its `Arc` allocation,
//! never by directory path: two configs may legitimately watch the same
//! directory independently. `TaskProfile` is owned by the caller; the core
//! only reads its flags, takes trigger-time snapshots, and appends or
//! removes configs by identity through the narrow accessors here.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Where relocated files land.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelocationTarget {
    /// Destination directory for relocated files. Created on first use.
    pub directory: PathBuf,
}

/// One directory watch description. Immutable once built; runtime-mutable
/// flags live on the owning [`TaskProfile`].
#[derive(Debug, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Directory to watch for newly appearing files.
    pub directory: PathBuf,
    /// Destination resolver for relocation, when the profile asks for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<RelocationTarget>,
}

impl WatchConfig {
    /// A watch with no relocation target.
    pub fn new(directory: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            directory: directory.into(),
            target: None,
        })
    }

    /// A watch whose triggers move into `target` before dispatch.
    pub fn with_target(directory: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            directory: directory.into(),
            target: Some(RelocationTarget {
                directory: target.into(),
            }),
        })
    }
}

/// Identity of a tracked config: the address of its `Arc` allocation.
///
/// The registry keys its tracked set by this, so lookup is by object
/// identity and never by directory path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigId(usize);

impl ConfigId {
    pub fn of(config: &Arc<WatchConfig>) -> Self {
        Self(Arc::as_ptr(config) as usize)
    }
}

/// Externally owned bundle a watch belongs to.
///
/// The core reads `enabled` and `relocate` fresh at trigger time and keeps
/// the profile's config list in sync (append-if-absent, remove-by-identity);
/// everything else about the profile is the owner's business.
#[derive(Debug)]
pub struct TaskProfile {
    /// Display name, carried into dispatch for the pipeline's benefit.
    pub name: String,
    enabled: RwLock<bool>,
    relocate: RwLock<bool>,
    configs: RwLock<Vec<Arc<WatchConfig>>>,
}

impl TaskProfile {
    pub fn new(name: impl Into<String>, enabled: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            enabled: RwLock::new(enabled),
            relocate: RwLock::new(false),
            configs: RwLock::new(Vec::new()),
        })
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.read()
    }

    pub fn set_enabled(&self, enabled: bool) {
        *self.enabled.write() = enabled;
    }

    pub fn relocates(&self) -> bool {
        *self.relocate.read()
    }

    /// Turn relocation on or off for all of this profile's watches.
    /// Takes effect on the next trigger; entries read the flag fresh.
    pub fn set_relocate(&self, relocate: bool) {
        *self.relocate.write() = relocate;
    }

    /// Append `config` to this profile's list if not already present.
    /// Idempotent; presence is judged by identity, not by path.
    pub fn ensure_config(&self, config: &Arc<WatchConfig>) {
        let mut configs = self.configs.write();
        if !configs.iter().any(|c| Arc::ptr_eq(c, config)) {
            configs.push(Arc::clone(config));
        }
    }

    /// Remove `config` from this profile's list by identity. No-op when absent.
    pub fn remove_config(&self, config: &Arc<WatchConfig>) {
        self.configs.write().retain(|c| !Arc::ptr_eq(c, config));
    }

    pub fn config_count(&self) -> usize {
        self.configs.read().len()
    }

    pub fn contains_config(&self, config: &Arc<WatchConfig>) -> bool {
        self.configs.read().iter().any(|c| Arc::ptr_eq(c, config))
    }

    /// Resolve the fields one trigger needs, read fresh at trigger time
    /// rather than cached at entry construction.
    pub fn snapshot(&self, config: &WatchConfig) -> ProfileSnapshot {
        ProfileSnapshot {
            profile_name: self.name.clone(),
            enabled: self.is_enabled(),
            relocate: self.relocates(),
            target: config.target.clone(),
        }
    }
}

/// Point-in-time copy of the profile and config fields one trigger needs.
/// Handed to the dispatch sink alongside the finalized path.
#[derive(Debug, Clone)]
pub struct ProfileSnapshot {
    pub profile_name: String,
    pub enabled: bool,
    pub relocate: bool,
    pub target: Option<RelocationTarget>,
}
