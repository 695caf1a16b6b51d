use smallvec::SmallVec;

use crate::watcher::{Watcher, WatcherId};

/// The watchers subscribed to one [`Subject`](super::Subject).
///
/// Membership is keyed by watcher id, so adding a watcher that is already
/// present (or removing one that is absent) is a no-op.
///
/// # Design
///
/// - **SmallVec Optimization**: most reactive properties are read by one or
///   two watchers, `SmallVec<[_; 2]>` keeps those lists off the heap.
/// - **Insertion order**: the list is kept in subscription order; notification
///   may re-order a snapshot, never the list itself.
#[derive(Default)]
pub struct Subscribers {
  items: SmallVec<[(WatcherId, Watcher); 2]>,
}

impl Subscribers {
  /// Add a watcher. Returns false when it was already subscribed.
  pub fn add(&mut self, watcher: Watcher) -> bool {
    let id = watcher.id();
    if self.contains(id) {
      false
    } else {
      self.items.push((id, watcher));
      true
    }
  }

  /// Remove a watcher by id.
  pub fn remove(&mut self, id: WatcherId) -> Option<Watcher> {
    self
      .items
      .iter()
      .position(|(i, _)| *i == id)
      .map(|pos| self.items.remove(pos).1)
  }

  #[inline]
  pub fn contains(&self, id: WatcherId) -> bool { self.items.iter().any(|(i, _)| *i == id) }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  /// Subscriber ids in subscription order.
  pub fn ids(&self) -> Vec<WatcherId> { self.items.iter().map(|(id, _)| *id).collect() }

  /// Clone the current subscribers out so they can be notified without
  /// holding a borrow of this list.
  ///
  /// With `sorted` the snapshot is ordered by ascending watcher id, which
  /// makes notification order deterministic regardless of subscription order.
  pub(crate) fn snapshot(&self, sorted: bool) -> SmallVec<[Watcher; 4]> {
    let mut snapshot: SmallVec<[(WatcherId, Watcher); 4]> = self.items.iter().cloned().collect();
    if sorted {
      snapshot.sort_by_key(|(id, _)| *id);
    }
    snapshot.into_iter().map(|(_, w)| w).collect()
  }
}
