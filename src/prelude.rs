//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and functions for easy access.

// Configuration and errors
pub use crate::config::{configure, Config};
pub use crate::error::{ReactiveError, Result};
// Observation
pub use crate::observable::{
  define_reactive, define_shallow_reactive, del, observe, observe_root, set, Array, Descriptor,
  Key, Object, Observer, Opaque, Value,
};
// Scheduling
pub use crate::scheduler::{next_tick, on_flushed, queue_watcher, tick, Scheduler};
// Watchers
pub use crate::{
  computed::Computed,
  context::untracked,
  scope::WatcherScope,
  subject::{Subject, SubjectId},
  traverse::traverse,
  watch::{watch, watch_in},
  watcher::{Source, WatchOptions, Watcher, WatcherId},
};
