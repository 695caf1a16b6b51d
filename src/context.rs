//! Evaluation context: the stack of currently-evaluating watchers.
//!
//! While a watcher runs its getter it sits on top of this stack, and every
//! subject read during that time registers itself against it. Nested
//! evaluations (a computed value read inside another watcher) push on top and
//! restore the outer target when they finish.
//!
//! The stack is only touched through [`TargetGuard`], which pops on drop. A
//! getter that returns an error or panics therefore never leaves a stale
//! target behind.

use std::cell::RefCell;

use crate::watcher::Watcher;

thread_local! {
  static TARGET_STACK: RefCell<Vec<Option<Watcher>>> = const { RefCell::new(Vec::new()) };
}

/// Scoped ownership of one entry on the target stack.
#[must_use = "the target is popped as soon as the guard is dropped"]
pub struct TargetGuard {
  depth: usize,
}

impl Drop for TargetGuard {
  fn drop(&mut self) {
    TARGET_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      debug_assert_eq!(stack.len(), self.depth, "target stack popped out of order");
      stack.pop();
    });
  }
}

/// Push `target` (or an explicit "no target") for the guard's lifetime.
pub(crate) fn push_target(target: Option<Watcher>) -> TargetGuard {
  TARGET_STACK.with(|stack| {
    let mut stack = stack.borrow_mut();
    stack.push(target);
    TargetGuard { depth: stack.len() }
  })
}

/// The watcher currently collecting dependencies, if any.
pub fn current_target() -> Option<Watcher> {
  TARGET_STACK.with(|stack| stack.borrow().last().cloned().flatten())
}

/// Cheaper check than [`current_target`] when the watcher itself is unused.
pub fn is_tracking() -> bool {
  TARGET_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
}

/// Depth of the target stack, including explicit "no target" entries.
pub fn depth() -> usize { TARGET_STACK.with(|stack| stack.borrow().len()) }

/// Run `f` with dependency collection suspended.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
  let _guard = push_target(None);
  f()
}
