//! Error types surfaced by watchers and the scheduler.

use thiserror::Error;

/// Errors produced while evaluating or flushing watchers.
///
/// Evaluator and callback failures carry the user's `anyhow::Error` as their
/// source. Whether they reach the caller or the configured error handler
/// depends on the watcher's `user` flag.
#[derive(Debug, Error)]
pub enum ReactiveError {
  #[error("getter for watcher \"{expression}\" failed: {source}")]
  Getter {
    expression: String,
    #[source]
    source: anyhow::Error,
  },

  #[error("callback for watcher \"{expression}\" failed: {source}")]
  Callback {
    expression: String,
    #[source]
    source: anyhow::Error,
  },

  #[error(
    "you may have an infinite update loop in watcher \"{expression}\" (re-queued more than \
     {limit} times in one flush)"
  )]
  CircularUpdate { expression: String, limit: usize },
}

impl ReactiveError {
  /// The expression of the watcher this error originated from.
  pub fn expression(&self) -> &str {
    match self {
      ReactiveError::Getter { expression, .. }
      | ReactiveError::Callback { expression, .. }
      | ReactiveError::CircularUpdate { expression, .. } => expression,
    }
  }

  pub fn is_circular(&self) -> bool { matches!(self, ReactiveError::CircularUpdate { .. }) }
}

pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;
