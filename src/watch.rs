//! The user-facing way to react to changes.

use std::rc::Rc;

use crate::{
  error::Result,
  observable::Value,
  scope::WatcherScope,
  watcher::{Source, WatchOptions, Watcher},
};

/// Call `callback` with `(new, old)` whenever the value of `source` changes.
///
/// The watcher is always a user watcher: errors in the getter or the callback
/// are sent to the error handler instead of being returned. With
/// `options.immediate` the callback fires once right away with the initial
/// value and `Undefined`. Tear the returned watcher down to stop watching.
pub fn watch<F>(source: Source, callback: F, options: WatchOptions) -> Result<Watcher>
where
  F: Fn(&Value, &Value) -> anyhow::Result<()> + 'static,
{
  create(None, source, Rc::new(callback), options)
}

/// [`watch`] with the watcher owned by `scope`.
pub fn watch_in<F>(
  scope: &WatcherScope, source: Source, callback: F, options: WatchOptions,
) -> Result<Watcher>
where
  F: Fn(&Value, &Value) -> anyhow::Result<()> + 'static,
{
  create(Some(scope), source, Rc::new(callback), options)
}

fn create<F>(
  scope: Option<&WatcherScope>, source: Source, callback: Rc<F>, options: WatchOptions,
) -> Result<Watcher>
where
  F: Fn(&Value, &Value) -> anyhow::Result<()> + 'static,
{
  let immediate = options.immediate;
  let watcher = Watcher::create(scope, source, callback, WatchOptions { user: true, ..options })?;
  if immediate {
    let info = format!("callback for immediate watcher \"{}\"", watcher.expression());
    watcher.invoke_callback(&watcher.value(), &Value::Undefined, &info)?;
  }
  Ok(watcher)
}
