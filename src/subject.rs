//! Subjects: the per-property dependency record.
//!
//! A [`Subject`] holds the watchers interested in one reactive property (or in
//! the structure of one observed container) and notifies them when it
//! changes. The relationship is kept symmetric with the watcher side: a
//! watcher is in a subject's subscriber list exactly when that subject is in
//! the watcher's latest dependency set.

mod subscribers;

use std::{
  fmt,
  sync::atomic::{AtomicUsize, Ordering},
};

pub use subscribers::Subscribers;

use crate::{
  context,
  rc::{MutRc, RcDeref, RcDerefMut},
  watcher::{Watcher, WatcherId},
};

/// Process-unique subject identity, assigned in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(pub usize);

static NEXT_SUBJECT_ID: AtomicUsize = AtomicUsize::new(0);

impl SubjectId {
  fn next() -> Self { SubjectId(NEXT_SUBJECT_ID.fetch_add(1, Ordering::Relaxed)) }
}

/// A dependency that watchers subscribe to.
///
/// Cloning a `Subject` yields another handle to the same subscriber list.
#[derive(Clone)]
pub struct Subject {
  id: SubjectId,
  subs: MutRc<Subscribers>,
}

impl Default for Subject {
  fn default() -> Self { Self::new() }
}

impl Subject {
  pub fn new() -> Self {
    Subject { id: SubjectId::next(), subs: MutRc::own(Subscribers::default()) }
  }

  #[inline]
  pub fn id(&self) -> SubjectId { self.id }

  /// Subscribe `watcher`. No-op when it is already subscribed.
  pub fn add_sub(&self, watcher: Watcher) { self.subs.rc_deref_mut().add(watcher); }

  /// Unsubscribe the watcher with `id`. No-op when it is absent.
  pub fn remove_sub(&self, id: WatcherId) { self.subs.rc_deref_mut().remove(id); }

  /// Register this subject with the currently-evaluating watcher, if any.
  pub fn depend(&self) {
    if let Some(target) = context::current_target() {
      target.add_dep(self);
    }
  }

  /// Ask every subscriber to update.
  ///
  /// Subscribers are snapshotted first: watchers that re-evaluate
  /// synchronously re-subscribe while this loop is still running. Debug
  /// builds notify in ascending watcher id so ordering is reproducible.
  pub fn notify(&self) {
    let snapshot = self.subs.rc_deref().snapshot(cfg!(debug_assertions));
    tracing::trace!(subject = self.id.0, subscribers = snapshot.len(), "notify");
    for watcher in snapshot {
      watcher.update();
    }
  }

  pub fn subscriber_count(&self) -> usize { self.subs.rc_deref().len() }

  pub fn subscriber_ids(&self) -> Vec<WatcherId> { self.subs.rc_deref().ids() }

  pub fn has_subscriber(&self, id: WatcherId) -> bool { self.subs.rc_deref().contains(id) }
}

impl PartialEq for Subject {
  fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for Subject {}

impl fmt::Debug for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subject")
      .field("id", &self.id.0)
      .field("subscribers", &self.subscriber_ids())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;
  use crate::{
    prelude::*,
    watcher::{Source, WatchOptions},
  };

  #[rxwatch_macro::test]
  fn ids_are_monotonic() {
    let a = Subject::new();
    let b = Subject::new();
    assert!(b.id() > a.id());
    assert_ne!(a, b);
  }

  #[rxwatch_macro::test]
  fn depend_without_target_is_noop() {
    let subject = Subject::new();
    subject.depend();
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[rxwatch_macro::test]
  fn add_and_remove_are_idempotent() {
    let subject = Subject::new();
    let w = Watcher::new(
      Source::getter(|| Value::Undefined),
      |_, _| Ok(()),
      WatchOptions::default().lazy(),
    )
    .unwrap();

    subject.add_sub(w.clone());
    subject.add_sub(w.clone());
    assert_eq!(subject.subscriber_count(), 1);

    subject.remove_sub(w.id());
    subject.remove_sub(w.id());
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[cfg(debug_assertions)]
  #[rxwatch_macro::test]
  fn notify_visits_subscribers_in_id_order() {
    let order = Rc::new(RefCell::new(vec![]));
    let subject = Subject::new();

    let mut watchers = vec![];
    for n in 0..3 {
      let c_order = order.clone();
      // deep watchers fire on every run, even when the value is unchanged
      watchers.push(
        Watcher::new(
          Source::getter(|| Value::Undefined),
          move |_, _| {
            c_order.borrow_mut().push(n);
            Ok(())
          },
          WatchOptions::default().sync().deep(),
        )
        .unwrap(),
      );
    }
    for w in watchers.iter().rev() {
      subject.add_sub(w.clone());
    }

    subject.notify();
    assert_eq!(*order.borrow(), vec![0, 1, 2]);
  }
}
