use std::{cmp::Ordering, fmt, mem};

use super::{observe, Observer, Value};
use crate::{
  config, context,
  rc::{MutRc, RcDeref, RcDerefMut},
};

/// A shared sequence whose mutating operations notify watchers.
///
/// Every length-changing or reordering operation is a method here, so there
/// is no way to mutate an observed array behind the runtime's back except
/// [`Array::assign`], the plain index write, which is deliberately untracked.
/// Use [`set`](crate::observable::set) and [`del`](crate::observable::del)
/// for tracked index writes.
#[derive(Clone, Default)]
pub struct Array(MutRc<ArrayData>);

#[derive(Default)]
pub(crate) struct ArrayData {
  items: Vec<Value>,
  observer: Option<Observer>,
  frozen: bool,
  raw: bool,
}

impl Array {
  pub fn new() -> Self { Self::default() }

  // ==== Reads ====

  pub fn len(&self) -> usize {
    self.track();
    self.0.rc_deref().items.len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  pub fn get(&self, index: usize) -> Value {
    self.track();
    self.0.rc_deref().items.get(index).cloned().unwrap_or_default()
  }

  pub fn to_vec(&self) -> Vec<Value> {
    self.track();
    self.0.rc_deref().items.clone()
  }

  pub(crate) fn peek_items(&self) -> Vec<Value> {
    self.0.try_rc_deref().map(|d| d.items.clone()).unwrap_or_default()
  }

  // ==== Intercepted mutations ====

  /// Append one item and return the new length.
  pub fn push(&self, value: impl Into<Value>) -> usize {
    let value = value.into();
    self
      .mutate("push", vec![value.clone()], |items| {
        items.push(value);
        items.len()
      })
      .unwrap_or_else(|| self.peek_len())
  }

  pub fn extend<I, V>(&self, values: I) -> usize
  where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
  {
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    let inserted = values.clone();
    self
      .mutate("extend", inserted, |items| {
        items.extend(values);
        items.len()
      })
      .unwrap_or_else(|| self.peek_len())
  }

  pub fn pop(&self) -> Value { self.mutate("pop", vec![], Vec::pop).flatten().unwrap_or_default() }

  pub fn shift(&self) -> Value {
    self
      .mutate("shift", vec![], |items| (!items.is_empty()).then(|| items.remove(0)))
      .flatten()
      .unwrap_or_default()
  }

  /// Prepend one item and return the new length.
  pub fn unshift(&self, value: impl Into<Value>) -> usize {
    let value = value.into();
    self
      .mutate("unshift", vec![value.clone()], |items| {
        items.insert(0, value);
        items.len()
      })
      .unwrap_or_else(|| self.peek_len())
  }

  /// Remove `delete_count` items at `start`, insert `items` in their place and
  /// return the removed items. Both bounds are clamped to the array.
  pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
    let inserted = items.clone();
    self
      .mutate("splice", inserted, |current| {
        let start = start.min(current.len());
        let end = start + delete_count.min(current.len() - start);
        current.splice(start..end, items).collect()
      })
      .unwrap_or_default()
  }

  /// Sort in place with the default value ordering.
  pub fn sort(&self) { self.sort_by(Value::sort_cmp) }

  /// Sort in place. The comparator sees the items detached from the array;
  /// they are put back even if it panics.
  pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> Ordering) {
    let Some(items) = self.detach("sort") else { return };
    let mut detached = Detached { array: self, items };
    detached.items.sort_by(&mut compare);
    drop(detached);
    self.notify();
  }

  pub fn reverse(&self) { self.mutate("reverse", vec![], |items| items.reverse()); }

  /// Plain index write: no observation of `value`, no notification. Writing
  /// past the end pads with `Undefined`.
  pub fn assign(&self, index: usize, value: impl Into<Value>) -> bool {
    let mut data = self.0.rc_deref_mut();
    if data.frozen {
      return false;
    }
    if !make_room(&mut data.items, index) {
      drop(data);
      config::warn(format_args!("Array index {index} is out of range."));
      return false;
    }
    let value = value.into();
    if index == data.items.len() {
      data.items.push(value);
    } else {
      data.items[index] = value;
    }
    true
  }

  // ==== Integrity ====

  pub fn freeze(&self) { self.0.rc_deref_mut().frozen = true; }

  pub fn is_frozen(&self) -> bool { self.0.rc_deref().frozen }

  pub fn mark_raw(&self) { self.0.rc_deref_mut().raw = true; }

  pub fn is_raw(&self) -> bool { self.0.rc_deref().raw }

  // ==== Observation ====

  pub fn observer(&self) -> Option<Observer> { self.0.rc_deref().observer.clone() }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { self.0.ptr_eq(&other.0) }

  #[inline]
  pub(crate) fn addr(&self) -> usize { self.0.addr() }

  pub(crate) fn observe(&self) -> Option<Observer> {
    {
      let data = self.0.rc_deref();
      if let Some(ob) = &data.observer {
        return Some(ob.clone());
      }
      if data.raw || data.frozen || !super::is_observing() {
        return None;
      }
    }
    let ob = Observer::new();
    self.0.rc_deref_mut().observer = Some(ob.clone());
    for item in self.peek_items() {
      observe(&item);
    }
    Some(ob)
  }

  /// Prepare a tracked write at `index`: pad with `Undefined` up to it
  /// without notifying. Frozen arrays and unaddressable indices are refused
  /// with a warning and left untouched.
  pub(crate) fn prepare_index(&self, index: usize) -> bool {
    let mut data = self.0.rc_deref_mut();
    let refusal = if data.frozen {
      "Cannot set on a frozen array.".to_owned()
    } else if !make_room(&mut data.items, index) {
      format!("Array index {index} is out of range.")
    } else {
      return true;
    };
    drop(data);
    config::warn(refusal);
    false
  }

  fn peek_len(&self) -> usize { self.0.rc_deref().items.len() }

  fn track(&self) {
    if context::is_tracking() {
      let ob = self.observer();
      if let Some(ob) = ob {
        ob.subject().depend();
      }
    }
  }

  /// Run `op` on the items, then observe `inserted` and notify the structural
  /// subject. The borrow is released before either happens. Frozen arrays
  /// refuse with a warning and yield `None`.
  fn mutate<R>(
    &self, name: &str, inserted: Vec<Value>, op: impl FnOnce(&mut Vec<Value>) -> R,
  ) -> Option<R> {
    let result = {
      let mut data = self.0.rc_deref_mut();
      if data.frozen {
        drop(data);
        config::warn(format_args!("Cannot {name} on a frozen array."));
        return None;
      }
      op(&mut data.items)
    };
    if self.observer().is_some() {
      for item in &inserted {
        observe(item);
      }
    }
    self.notify();
    Some(result)
  }

  fn detach(&self, name: &str) -> Option<Vec<Value>> {
    let mut data = self.0.rc_deref_mut();
    if data.frozen {
      drop(data);
      config::warn(format_args!("Cannot {name} on a frozen array."));
      return None;
    }
    Some(mem::take(&mut data.items))
  }

  fn notify(&self) {
    let ob = self.observer();
    if let Some(ob) = ob {
      ob.subject().notify();
    }
  }
}

/// Items taken out of an array for the duration of a sort.
struct Detached<'a> {
  array: &'a Array,
  items: Vec<Value>,
}

impl Drop for Detached<'_> {
  fn drop(&mut self) { self.array.0.rc_deref_mut().items = mem::take(&mut self.items); }
}

/// Pad `items` with `Undefined` up to `index` and reserve room for one item
/// there. False when the length would overflow or cannot be allocated.
fn make_room(items: &mut Vec<Value>, index: usize) -> bool {
  let Some(len) = index.checked_add(1) else { return false };
  if len > items.len() && items.try_reserve(len - items.len()).is_err() {
    return false;
  }
  if items.len() < index {
    items.resize(index, Value::Undefined);
  }
  true
}

impl From<Vec<Value>> for Array {
  fn from(items: Vec<Value>) -> Self {
    Array(MutRc::own(ArrayData { items, ..Default::default() }))
  }
}

impl<V: Into<Value>> FromIterator<V> for Array {
  fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
    Array::from(iter.into_iter().map(Into::into).collect::<Vec<_>>())
  }
}

impl fmt::Debug for Array {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(&Value::Array(self.clone()), f)
  }
}

#[cfg(test)]
mod tests {
  use std::{
    cell::{Cell, RefCell},
    panic::{self, AssertUnwindSafe},
    rc::Rc,
  };

  use super::*;
  use crate::{
    observable::{observe, set},
    watcher::{Source, WatchOptions, Watcher},
  };

  fn nums(arr: &Array) -> Vec<f64> { arr.to_vec().iter().filter_map(Value::as_f64).collect() }

  #[rxwatch_macro::test]
  fn stack_and_queue_ops() {
    let arr: Array = [1, 2, 3].into_iter().collect();
    assert_eq!(arr.push(4), 4);
    assert_eq!(arr.pop(), Value::from(4));
    assert_eq!(arr.shift(), Value::from(1));
    assert_eq!(arr.unshift(0), 3);
    assert_eq!(nums(&arr), vec![0., 2., 3.]);
    assert_eq!(Array::new().pop(), Value::Undefined);
    assert_eq!(Array::new().shift(), Value::Undefined);
  }

  #[rxwatch_macro::test]
  fn splice_clamps() {
    let arr: Array = [1, 2, 3].into_iter().collect();
    let removed = arr.splice(1, 10, vec![Value::from(9)]);
    assert_eq!(removed, vec![Value::from(2), Value::from(3)]);
    assert_eq!(nums(&arr), vec![1., 9.]);

    arr.splice(7, 0, vec![Value::from(5)]);
    assert_eq!(nums(&arr), vec![1., 9., 5.]);
  }

  #[rxwatch_macro::test]
  fn sort_and_reverse() {
    let arr: Array = [3, 1, 2].into_iter().collect();
    arr.sort();
    assert_eq!(nums(&arr), vec![1., 2., 3.]);
    arr.reverse();
    assert_eq!(nums(&arr), vec![3., 2., 1.]);
    arr.sort_by(|a, b| a.sort_cmp(b).reverse());
    assert_eq!(nums(&arr), vec![3., 2., 1.]);
  }

  #[rxwatch_macro::test]
  fn assign_pads_with_undefined() {
    let arr = Array::new();
    arr.assign(2, "x");
    assert_eq!(arr.len(), 3);
    assert_eq!(arr.get(0), Value::Undefined);
    assert_eq!(arr.get(2), Value::from("x"));
  }

  #[rxwatch_macro::test]
  fn assign_refuses_unaddressable_index() {
    let arr: Array = [1].into_iter().collect();
    assert!(!arr.assign(usize::MAX, 2));
    assert!(!arr.assign(usize::MAX - 1, 2));
    assert_eq!(nums(&arr), vec![1.]);
  }

  #[rxwatch_macro::test]
  fn sort_restores_items_when_comparator_panics() {
    let arr: Array = [3, 1, 2].into_iter().collect();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
      arr.sort_by(|_, _| panic!("comparator exploded"));
    }));
    assert!(result.is_err());
    let mut left = nums(&arr);
    left.sort_by(f64::total_cmp);
    assert_eq!(left, vec![1., 2., 3.]);
  }

  #[rxwatch_macro::test]
  fn tracked_set_on_frozen_array_changes_nothing() {
    let warnings = Rc::new(RefCell::new(vec![]));
    let c_warnings = warnings.clone();
    config::configure(|c| {
      c.warn_handler = Some(Rc::new(move |m: &str| c_warnings.borrow_mut().push(m.to_owned())))
    });

    let arr: Array = [1].into_iter().collect();
    observe(&arr.clone().into());
    let notified = Rc::new(Cell::new(0));
    let c_notified = notified.clone();
    let w = Watcher::new(
      Source::getter({
        let arr = arr.clone();
        move || arr.to_vec().into()
      }),
      move |_, _| {
        c_notified.set(c_notified.get() + 1);
        Ok(())
      },
      WatchOptions::default().sync(),
    )
    .unwrap();
    arr.freeze();

    set(&arr.clone().into(), 3, 9);
    assert_eq!(nums(&arr), vec![1.]);
    assert_eq!(notified.get(), 0);
    assert_eq!(*warnings.borrow(), vec!["Cannot set on a frozen array.".to_owned()]);
    w.teardown();
    config::reset();
  }

  #[rxwatch_macro::test]
  fn tracked_set_refuses_unaddressable_index() {
    let arr: Array = [1].into_iter().collect();
    let value = Value::from(arr.clone());
    set(&value, usize::MAX, 2);
    set(&value, usize::MAX - 1, 2);
    assert_eq!(nums(&arr), vec![1.]);
  }

  #[rxwatch_macro::test]
  fn frozen_array_refuses_mutation() {
    let arr: Array = [1].into_iter().collect();
    arr.freeze();
    assert_eq!(arr.push(2), 1);
    assert!(!arr.assign(0, 5));
    arr.sort();
    assert_eq!(nums(&arr), vec![1.]);
  }
}
