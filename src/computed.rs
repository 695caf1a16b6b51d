//! Memoized derived values built on lazy watchers.

use std::{fmt, rc::Rc};

use crate::{
  config, context,
  error::Result,
  observable::{Object, Value},
  scope::WatcherScope,
  watcher::{Callback, Source, WatchOptions, Watcher},
};

/// A derived value, recomputed only after one of its dependencies changed and
/// only when read.
///
/// Reading a `Computed` inside another watcher makes that watcher depend on
/// the computed value's own dependencies.
#[derive(Clone)]
pub struct Computed {
  watcher: Watcher,
}

impl Computed {
  pub fn new(f: impl Fn() -> Value + 'static) -> Self {
    Self::from_source(None, Source::getter(f))
  }

  pub fn try_new(f: impl Fn() -> anyhow::Result<Value> + 'static) -> Self {
    Self::from_source(None, Source::try_getter(f))
  }

  pub fn new_in(scope: &WatcherScope, f: impl Fn() -> Value + 'static) -> Self {
    Self::from_source(Some(scope), Source::getter(f))
  }

  pub fn from_source(scope: Option<&WatcherScope>, source: Source) -> Self {
    let noop: Callback = Rc::new(|_: &Value, _: &Value| -> anyhow::Result<()> { Ok(()) });
    Computed { watcher: Watcher::construct(scope, source, noop, WatchOptions::default().lazy()) }
  }

  /// The current value, evaluated first when dirty.
  pub fn get(&self) -> Result<Value> {
    if self.watcher.is_dirty() {
      self.watcher.evaluate()?;
    }
    if context::is_tracking() {
      self.watcher.depend();
    }
    Ok(self.watcher.value())
  }

  /// Expose this value as a getter-only property `key` of `obj`. Evaluation
  /// errors are sent to the error handler and read as `Undefined`.
  pub fn install(&self, obj: &Object, key: &str) -> bool {
    let computed = self.clone();
    let info = format!("computed property \"{key}\"");
    obj.define_getter(key, move || {
      computed.get().unwrap_or_else(|err| {
        config::handle_error(&err, &info);
        Value::Undefined
      })
    })
  }

  pub fn watcher(&self) -> &Watcher { &self.watcher }

  pub fn is_dirty(&self) -> bool { self.watcher.is_dirty() }

  pub fn teardown(&self) { self.watcher.teardown() }
}

impl fmt::Debug for Computed {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Computed").field("watcher", &self.watcher).finish()
  }
}
