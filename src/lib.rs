//! Managed directory watches with debounced dispatch.
//!
//! Every file newly appearing under a watched directory triggers exactly one
//! downstream action: optional relocation, then hand-off to a processing
//! pipeline. Watches are added, removed, enabled, and disabled at runtime
//! through the registry.
//!
//! # Architecture
//!
//! ```text
//! WatchRegistry
//!   - tracked WatchEntry per config (identity, not path)
//!   - reconcile / add / remove / set_enabled / shutdown_all
//!         |
//!     WatchEntry
//!       - DebouncedEventSource (notify watch + settle timer)
//!       - relocate (optional, collision-safe)
//!       - DispatchSink (pipeline hand-off)
//! ```

pub mod config;
pub mod debounce;
pub mod dispatch;
pub mod entry;
pub mod error;
pub mod logging;
pub mod profile;
pub mod registry;
pub mod relocate;

pub use config::{Settings, WatcherConfig};
pub use debounce::{DebouncedEventSource, Debouncer, SourceEvent};
pub use dispatch::{ChannelSink, DispatchItem, DispatchSink};
pub use entry::WatchEntry;
pub use error::WatchError;
pub use profile::{ConfigId, ProfileSnapshot, RelocationTarget, TaskProfile, WatchConfig};
pub use registry::WatchRegistry;
