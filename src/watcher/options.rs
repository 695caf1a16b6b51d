use std::{fmt, rc::Rc};

/// Evaluation flags of a [`Watcher`](super::Watcher).
#[derive(Clone, Default)]
pub struct WatchOptions {
  /// Traverse the whole produced value so nested reads are tracked.
  pub deep: bool,
  /// Contain evaluator and callback errors in the error handler.
  pub user: bool,
  /// Evaluate on demand only; notifications just mark the value dirty.
  pub lazy: bool,
  /// Run immediately on notification instead of queuing.
  pub sync: bool,
  /// Fire the callback once right after creation. Honoured by
  /// [`watch`](crate::watch::watch).
  pub immediate: bool,
  /// Called by the scheduler right before the watcher runs in a flush.
  pub before: Option<Rc<dyn Fn()>>,
}

impl WatchOptions {
  pub fn deep(mut self) -> Self {
    self.deep = true;
    self
  }

  pub fn user(mut self) -> Self {
    self.user = true;
    self
  }

  pub fn lazy(mut self) -> Self {
    self.lazy = true;
    self
  }

  pub fn sync(mut self) -> Self {
    self.sync = true;
    self
  }

  pub fn immediate(mut self) -> Self {
    self.immediate = true;
    self
  }

  pub fn before(mut self, hook: impl Fn() + 'static) -> Self {
    self.before = Some(Rc::new(hook));
    self
  }
}

impl fmt::Debug for WatchOptions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WatchOptions")
      .field("deep", &self.deep)
      .field("user", &self.user)
      .field("lazy", &self.lazy)
      .field("sync", &self.sync)
      .field("immediate", &self.immediate)
      .field("before", &self.before.is_some())
      .finish()
  }
}
