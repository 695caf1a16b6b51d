//! Watcher scopes: ownership of a group of watchers that retire together.
//!
//! A scope stands in for whatever owns watchers in the host (a component
//! instance, a view). Each watcher created in a scope is recorded here and
//! removes itself when torn down on its own. Tearing down the scope retires
//! them all at once.

use std::fmt;

use smallvec::SmallVec;

use crate::{
  error::Result,
  observable::Value,
  rc::{MutRc, RcDeref, RcDerefMut, WeakRc},
  watch,
  watcher::{Source, WatchOptions, Watcher, WatcherId},
};

#[derive(Clone, Default)]
pub struct WatcherScope(MutRc<ScopeState>);

/// Non-owning back reference held by each watcher of a scope.
#[derive(Clone)]
pub(crate) struct WeakScope(WeakRc<ScopeState>);

#[derive(Default)]
struct ScopeState {
  being_destroyed: bool,
  destroyed: bool,
  watchers: SmallVec<[Watcher; 4]>,
}

impl WatcherScope {
  pub fn new() -> Self { Self::default() }

  /// User watcher owned by this scope, see [`watch::watch`].
  pub fn watch<F>(&self, source: Source, callback: F, options: WatchOptions) -> Result<Watcher>
  where
    F: Fn(&Value, &Value) -> anyhow::Result<()> + 'static,
  {
    watch::watch_in(self, source, callback, options)
  }

  /// Watchers still registered, in creation order.
  pub fn watchers(&self) -> Vec<Watcher> { self.0.rc_deref().watchers.to_vec() }

  pub fn len(&self) -> usize { self.0.rc_deref().watchers.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  pub fn is_being_destroyed(&self) -> bool { self.0.rc_deref().being_destroyed }

  pub fn is_destroyed(&self) -> bool { self.0.rc_deref().destroyed }

  /// Tear down every watcher, newest first. Idempotent.
  pub fn teardown(&self) {
    let watchers = {
      let mut state = self.0.rc_deref_mut();
      if state.being_destroyed || state.destroyed {
        return;
      }
      state.being_destroyed = true;
      std::mem::take(&mut state.watchers)
    };
    tracing::debug!(watchers = watchers.len(), "scope teardown");
    for watcher in watchers.iter().rev() {
      watcher.teardown();
    }
    let mut state = self.0.rc_deref_mut();
    state.being_destroyed = false;
    state.destroyed = true;
  }

  pub(crate) fn register(&self, watcher: Watcher) {
    let closed = {
      let mut state = self.0.rc_deref_mut();
      let closed = state.being_destroyed || state.destroyed;
      if !closed {
        state.watchers.push(watcher.clone());
      }
      closed
    };
    if closed {
      watcher.teardown();
    }
  }

  pub(crate) fn remove(&self, id: WatcherId) {
    self.0.rc_deref_mut().watchers.retain(|w| w.id() != id);
  }

  pub(crate) fn downgrade(&self) -> WeakScope { WeakScope(self.0.downgrade()) }
}

impl WeakScope {
  pub(crate) fn upgrade(&self) -> Option<WatcherScope> { self.0.upgrade().map(WatcherScope) }
}

impl fmt::Debug for WatcherScope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.0.rc_deref();
    f.debug_struct("WatcherScope")
      .field("being_destroyed", &state.being_destroyed)
      .field("destroyed", &state.destroyed)
      .field("watcher_count", &state.watchers.len())
      .finish()
  }
}
