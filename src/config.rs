//! Runtime configuration and the diagnostic channels.
//!
//! Configuration is thread-local, matching the single-threaded model of the
//! rest of the crate. Handlers are cloned out of the cell before they are
//! invoked, so a handler may itself reconfigure the runtime.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::error::ReactiveError;

/// Receives every contained error together with a short context description.
pub type ErrorHandler = Rc<dyn Fn(&ReactiveError, &str)>;

/// Receives advisory warnings.
pub type WarnHandler = Rc<dyn Fn(&str)>;

pub const DEFAULT_MAX_UPDATE_COUNT: usize = 100;

#[derive(Clone)]
pub struct Config {
  /// How often a single watcher may be re-queued inside one flush before it
  /// is treated as a circular update.
  pub max_update_count: usize,
  /// When false, queued watchers are flushed synchronously instead of on the
  /// next tick of the installed scheduler.
  pub async_flush: bool,
  /// Suppresses warnings entirely.
  pub silent: bool,
  pub error_handler: Option<ErrorHandler>,
  pub warn_handler: Option<WarnHandler>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      max_update_count: DEFAULT_MAX_UPDATE_COUNT,
      async_flush: true,
      silent: false,
      error_handler: None,
      warn_handler: None,
    }
  }
}

impl fmt::Debug for Config {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Config")
      .field("max_update_count", &self.max_update_count)
      .field("async_flush", &self.async_flush)
      .field("silent", &self.silent)
      .field("error_handler", &self.error_handler.is_some())
      .field("warn_handler", &self.warn_handler.is_some())
      .finish()
  }
}

thread_local! {
  static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// Mutate the configuration of the current thread.
pub fn configure(f: impl FnOnce(&mut Config)) { CONFIG.with(|c| f(&mut c.borrow_mut())) }

/// Restore the default configuration.
pub fn reset() { CONFIG.with(|c| *c.borrow_mut() = Config::default()) }

/// A snapshot of the current configuration.
pub fn current() -> Config { CONFIG.with(|c| c.borrow().clone()) }

pub(crate) fn max_update_count() -> usize { CONFIG.with(|c| c.borrow().max_update_count) }

pub(crate) fn async_flush() -> bool { CONFIG.with(|c| c.borrow().async_flush) }

/// Route a contained error to the error handler, or log it.
pub fn handle_error(err: &ReactiveError, info: &str) {
  let handler = CONFIG.with(|c| c.borrow().error_handler.clone());
  match handler {
    Some(handler) => handler(err, info),
    None => tracing::error!(error = %err, info, "error in reactive runtime"),
  }
}

/// Emit an advisory warning.
pub fn warn(msg: impl fmt::Display) {
  let (silent, handler) = CONFIG.with(|c| {
    let c = c.borrow();
    (c.silent, c.warn_handler.clone())
  });
  if silent {
    return;
  }
  let msg = msg.to_string();
  match handler {
    Some(handler) => handler(&msg),
    None => tracing::warn!("{msg}"),
  }
}
