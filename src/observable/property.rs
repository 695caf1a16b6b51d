use std::{cell::RefCell, collections::HashSet, fmt, rc::Rc};

use super::{observe, Array, Observer, Value};
use crate::{context, subject::Subject};

pub(crate) type GetFn = Rc<dyn Fn() -> Value>;
pub(crate) type SetFn = Rc<dyn Fn(Value)>;

/// One reactive property: the value (or the accessor pair it wraps) together
/// with the subject that records who read it.
pub(crate) struct ReactiveProperty {
  subject: Subject,
  value: RefCell<Value>,
  child: RefCell<Option<Observer>>,
  getter: Option<GetFn>,
  setter: Option<SetFn>,
  shallow: bool,
}

impl ReactiveProperty {
  pub(crate) fn new(
    value: Value, getter: Option<GetFn>, setter: Option<SetFn>, shallow: bool,
  ) -> Self {
    let child = if shallow { None } else { observe(&value) };
    ReactiveProperty {
      subject: Subject::new(),
      value: RefCell::new(value),
      child: RefCell::new(child),
      getter,
      setter,
      shallow,
    }
  }

  #[inline]
  pub(crate) fn subject(&self) -> &Subject { &self.subject }

  /// Tracked read.
  pub(crate) fn get(&self) -> Value {
    let value = self.current();
    if context::is_tracking() {
      self.subject.depend();
      let child = self.child.borrow().clone();
      if let Some(child) = child {
        child.subject().depend();
        if let Value::Array(arr) = &value {
          depend_array(arr, &mut HashSet::new());
        }
      }
    }
    value
  }

  /// Write with change detection. Identical values, and `NaN` over `NaN`, are
  /// dropped without notifying.
  pub(crate) fn set(&self, new: Value) {
    let old = context::untracked(|| self.current());
    if new.same(&old) || (new.is_nan() && old.is_nan()) {
      return;
    }
    match (&self.getter, &self.setter) {
      (Some(_), None) => return,
      (_, Some(setter)) => setter(new.clone()),
      (None, None) => *self.value.borrow_mut() = new.clone(),
    }
    let child = if self.shallow { None } else { observe(&new) };
    *self.child.borrow_mut() = child;
    self.subject.notify();
  }

  /// Untracked read of the stored value. Wrapped accessors are not invoked.
  pub(crate) fn peek(&self) -> Option<Value> {
    if self.getter.is_some() {
      None
    } else {
      self.value.try_borrow().ok().map(|v| v.clone())
    }
  }

  fn current(&self) -> Value {
    match &self.getter {
      Some(getter) => getter(),
      None => self.value.borrow().clone(),
    }
  }
}

/// Reading a whole array depends on every observed container nested in it,
/// since element access cannot be intercepted per index.
fn depend_array(arr: &Array, seen: &mut HashSet<usize>) {
  if !seen.insert(arr.addr()) {
    return;
  }
  for item in arr.peek_items() {
    if let Some(ob) = item.observer() {
      ob.subject().depend();
    }
    if let Value::Array(inner) = &item {
      depend_array(inner, seen);
    }
  }
}

impl fmt::Debug for ReactiveProperty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ReactiveProperty")
      .field("subject", &self.subject.id())
      .field("accessor", &self.getter.is_some())
      .field("shallow", &self.shallow)
      .finish()
  }
}
