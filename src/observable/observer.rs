use std::{cell::Cell, fmt, rc::Rc};

use crate::subject::Subject;

/// The marker attached to every observed object or array.
///
/// At most one exists per container; observing the same container again hands
/// back a clone of this handle. The structural [`Subject`] is notified for
/// changes that are not a single property write: new keys, deleted keys and
/// the intercepted array mutations.
#[derive(Clone)]
pub struct Observer(Rc<ObserverInner>);

struct ObserverInner {
  subject: Subject,
  root_count: Cell<usize>,
}

impl Observer {
  pub(crate) fn new() -> Self {
    Observer(Rc::new(ObserverInner { subject: Subject::new(), root_count: Cell::new(0) }))
  }

  /// The structural subject of the container.
  #[inline]
  pub fn subject(&self) -> &Subject { &self.0.subject }

  /// How many observation roots point at the container.
  #[inline]
  pub fn root_count(&self) -> usize { self.0.root_count.get() }

  pub(crate) fn add_root(&self) { self.0.root_count.set(self.0.root_count.get() + 1) }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl fmt::Debug for Observer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Observer")
      .field("subject", &self.0.subject.id())
      .field("root_count", &self.root_count())
      .finish()
  }
}
