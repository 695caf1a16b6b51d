//! Converting plain data into observed data.
//!
//! [`observe`] attaches an [`Observer`] marker to an object or array and turns
//! every enumerable property into a reactive property: reads register with
//! the evaluating watcher, writes notify. Arrays notify through their
//! intercepted mutation methods. Changes that cannot be expressed as a write
//! to an existing property go through [`set`] and [`del`].

mod array;
mod object;
mod observer;
mod property;
mod value;

use std::{cell::Cell, fmt, rc::Rc};

pub use array::Array;
pub use object::{Descriptor, Object};
pub use observer::Observer;
pub use value::{Opaque, Value};

use self::{
  object::{Property, Slot},
  property::{GetFn, ReactiveProperty, SetFn},
};
use crate::{
  config, context,
  rc::{RcDeref, RcDerefMut},
};

thread_local! {
  static SHOULD_OBSERVE: Cell<bool> = const { Cell::new(true) };
}

/// Switch creation of new markers on or off for this thread. Values that are
/// already observed keep returning their marker either way.
pub fn toggle_observing(enabled: bool) { SHOULD_OBSERVE.with(|c| c.set(enabled)) }

pub fn is_observing() -> bool { SHOULD_OBSERVE.with(Cell::get) }

/// Make `value` reactive and return its marker.
///
/// Returns `None` for scalars, opaque values, raw containers and containers
/// that are frozen or no longer extensible. Observing the same container
/// twice returns the same marker and leaves its properties untouched.
pub fn observe(value: &Value) -> Option<Observer> {
  match value {
    Value::Object(o) => o.observe(),
    Value::Array(a) => a.observe(),
    _ => None,
  }
}

/// [`observe`] for a root data object. Roots refuse new keys through [`set`]
/// and key removal through [`del`].
pub fn observe_root(value: &Value) -> Option<Observer> {
  let ob = observe(value);
  if let Some(ob) = &ob {
    ob.add_root();
  }
  ob
}

/// Turn `key` of `obj` into a reactive property.
///
/// With `value` of `None` the current value of the property is kept. An
/// existing accessor pair is wrapped, so a getter-only accessor stays read
/// only. Non-configurable keys, and new keys on a non-extensible object, are
/// skipped.
pub fn define_reactive(obj: &Object, key: &str, value: Option<Value>) {
  define_reactive_with(obj, key, value, false)
}

/// Like [`define_reactive`], but values written later are not observed.
pub fn define_shallow_reactive(obj: &Object, key: &str, value: Option<Value>) {
  define_reactive_with(obj, key, value, true)
}

fn define_reactive_with(obj: &Object, key: &str, value: Option<Value>, shallow: bool) {
  let existing = {
    let data = obj.inner().rc_deref();
    match data.props.get(key) {
      Some(p) if !p.configurable => return,
      None if !data.extensible => return,
      Some(p) => Some((p.slot.clone(), p.enumerable)),
      None => None,
    }
  };

  let (getter, setter, stored, enumerable): (Option<GetFn>, Option<SetFn>, Value, bool) =
    match existing {
      None => (None, None, Value::Undefined, true),
      Some((Slot::Data(v), enumerable)) => (None, None, v, enumerable),
      Some((Slot::Accessor { get, set }, enumerable)) => (get, set, Value::Undefined, enumerable),
      Some((Slot::Reactive(cell), enumerable)) => {
        let c_cell = cell.clone();
        let get: GetFn = Rc::new(move || c_cell.get());
        let set: SetFn = Rc::new(move |v| cell.set(v));
        (Some(get), Some(set), Value::Undefined, enumerable)
      }
    };

  let initial = match value {
    Some(v) => v,
    None => match (&getter, &setter) {
      (Some(get), Some(_)) => context::untracked(|| get()),
      (Some(_), None) => Value::Undefined,
      (None, _) => stored,
    },
  };

  let cell = ReactiveProperty::new(initial, getter, setter, shallow);
  let prop = Property {
    slot: Slot::Reactive(Rc::new(cell)),
    configurable: true,
    enumerable,
    writable: true,
  };
  obj.inner().rc_deref_mut().props.insert(key.into(), prop);
}

/// A property key: an array index or a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
  Index(usize),
  Name(Rc<str>),
}

impl Key {
  /// Any run of ASCII digits that fits a `usize` is an index, leading zeros
  /// included (`"01"` is index 1).
  fn parse(s: &str) -> Key {
    let digits = !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match s.parse::<usize>() {
      Ok(index) if digits => Key::Index(index),
      _ => Key::Name(s.into()),
    }
  }

  fn name(&self) -> Rc<str> {
    match self {
      Key::Index(i) => i.to_string().into(),
      Key::Name(n) => n.clone(),
    }
  }
}

impl From<usize> for Key {
  fn from(i: usize) -> Self { Key::Index(i) }
}

impl From<&str> for Key {
  fn from(s: &str) -> Self { Key::parse(s) }
}

impl From<String> for Key {
  fn from(s: String) -> Self { Key::parse(&s) }
}

impl From<Rc<str>> for Key {
  fn from(s: Rc<str>) -> Self { Key::parse(&s) }
}

impl fmt::Display for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Key::Index(i) => write!(f, "{i}"),
      Key::Name(n) => f.write_str(n),
    }
  }
}

/// Set a property and make sure the change is seen.
///
/// On arrays an index write is a single-item splice, padding the array if
/// needed. On objects an existing key is assigned; a new key on an observed
/// object becomes reactive and the object's structural subject is notified.
/// Adding keys to a raw object or an observation root is refused with a
/// warning. Returns `value`.
pub fn set(target: &Value, key: impl Into<Key>, value: impl Into<Value>) -> Value {
  let key = key.into();
  let value = value.into();
  match target {
    Value::Array(arr) => match key {
      Key::Index(index) => {
        if arr.prepare_index(index) {
          arr.splice(index, 1, vec![value.clone()]);
        }
      }
      Key::Name(name) => config::warn(format_args!(
        "Cannot set non-index key \"{name}\" on an array; use an index instead."
      )),
    },
    Value::Object(obj) => set_on_object(obj, &key.name(), value.clone()),
    other => config::warn(format_args!(
      "Cannot set reactive property on undefined, null, or primitive value: {other:?}"
    )),
  }
  value
}

fn set_on_object(obj: &Object, key: &str, value: Value) {
  let (has_key, raw, extensible) = {
    let data = obj.inner().rc_deref();
    (data.props.contains_key(key), data.raw, data.extensible)
  };
  if has_key {
    obj.assign(key, value);
    return;
  }
  let ob = obj.observer();
  if raw || ob.as_ref().is_some_and(|ob| ob.root_count() > 0) {
    config::warn(
      "Avoid adding reactive properties to a framework-internal object or its root data at \
       runtime; declare it upfront instead.",
    );
    return;
  }
  let Some(ob) = ob else {
    obj.assign(key, value);
    return;
  };
  if !extensible {
    return;
  }
  define_reactive(obj, key, Some(value));
  ob.subject().notify();
}

/// Delete a property and make sure the change is seen.
///
/// On arrays an index delete is a single-item splice. On objects the
/// structural subject is notified when the key existed, was removed and the
/// object is observed. Raw objects and observation roots are refused with a
/// warning.
pub fn del(target: &Value, key: impl Into<Key>) {
  let key = key.into();
  match target {
    Value::Array(arr) => match key {
      Key::Index(index) => {
        arr.splice(index, 1, vec![]);
      }
      Key::Name(name) => config::warn(format_args!(
        "Cannot delete non-index key \"{name}\" on an array; use an index instead."
      )),
    },
    Value::Object(obj) => {
      let ob = obj.observer();
      if obj.is_raw() || ob.as_ref().is_some_and(|ob| ob.root_count() > 0) {
        config::warn(
          "Avoid deleting properties on a framework-internal object or its root data; just set \
           it to null.",
        );
        return;
      }
      let key = key.name();
      if !obj.inner().rc_deref().props.contains_key(&*key) || !obj.delete(&key) {
        return;
      }
      if let Some(ob) = ob {
        ob.subject().notify();
      }
    }
    other => config::warn(format_args!(
      "Cannot delete reactive property on undefined, null, or primitive value: {other:?}"
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::watcher::{Source, WatchOptions, Watcher};

  fn data(pairs: &[(&str, Value)]) -> Object {
    pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
  }

  #[rxwatch_macro::test]
  fn observe_is_idempotent() {
    let obj = data(&[("a", Value::from(1))]);
    let value = Value::from(obj.clone());
    let first = observe(&value).unwrap();
    let subject = obj.property_subject("a").unwrap();

    let second = observe(&value).unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(obj.property_subject("a").unwrap().id(), subject.id());
  }

  #[rxwatch_macro::test]
  fn observe_skips_scalars_frozen_and_raw() {
    assert!(observe(&Value::from(1)).is_none());
    assert!(observe(&Value::from(Opaque::new(()))).is_none());

    let frozen = Object::new();
    frozen.freeze();
    assert!(observe(&frozen.into()).is_none());

    let raw = Object::new();
    raw.mark_raw();
    assert!(observe(&raw.into()).is_none());

    let sealed = Array::new();
    sealed.freeze();
    assert!(observe(&sealed.into()).is_none());
  }

  #[rxwatch_macro::test]
  fn observe_is_deep_and_cycle_safe() {
    let inner = data(&[("y", Value::from(1))]);
    let outer = data(&[("x", Value::from(inner.clone()))]);
    outer.assign("me", outer.clone());
    observe(&outer.clone().into()).unwrap();

    assert!(inner.is_reactive("y"));
    assert!(outer.is_reactive("me"));
    assert!(inner.observer().is_some());
  }

  #[rxwatch_macro::test]
  fn toggled_off_observation_creates_no_marker() {
    toggle_observing(false);
    let obj = data(&[("a", Value::from(1))]);
    assert!(observe(&obj.clone().into()).is_none());
    toggle_observing(true);
    assert!(!obj.is_reactive("a"));
    assert!(is_observing());
  }

  #[rxwatch_macro::test]
  fn define_reactive_keeps_getter_only_read_only() {
    let obj = Object::new();
    obj.define_getter("fixed", || Value::from(7));
    define_reactive(&obj, "fixed", None);
    assert!(obj.is_reactive("fixed"));
    obj.assign("fixed", 1);
    assert_eq!(obj.get("fixed"), Value::from(7));
  }

  #[rxwatch_macro::test]
  fn define_reactive_skips_non_configurable() {
    let obj = Object::new();
    obj.define_property("locked", 1, Descriptor::default().non_configurable());
    define_reactive(&obj, "locked", None);
    assert!(!obj.is_reactive("locked"));
  }

  #[rxwatch_macro::test]
  fn set_on_unobserved_object_is_plain() {
    let obj = Object::new();
    let value = Value::from(obj.clone());
    assert_eq!(set(&value, "k", 3), Value::from(3));
    assert_eq!(obj.get("k"), Value::from(3));
    assert!(!obj.is_reactive("k"));
  }

  #[rxwatch_macro::test]
  fn set_refuses_new_keys_on_roots() {
    let obj = Object::new();
    let value = Value::from(obj.clone());
    observe_root(&value);
    set(&value, "late", 1);
    assert!(!obj.has("late"));
  }

  #[rxwatch_macro::test]
  fn set_and_del_on_arrays() {
    let arr: Array = [1, 2].into_iter().collect();
    let value = Value::from(arr.clone());
    set(&value, 4, "x");
    assert_eq!(arr.len(), 5);
    assert_eq!(arr.get(4), Value::from("x"));

    del(&value, "0");
    assert_eq!(arr.get(0), Value::from(2));
    assert_eq!(arr.len(), 4);
  }

  #[rxwatch_macro::test]
  fn leading_zero_keys_address_array_items() {
    let arr: Array = [1].into_iter().collect();
    observe(&arr.clone().into());
    let value = Value::from(arr.clone());
    let runs = Rc::new(Cell::new(0));
    let c_runs = runs.clone();
    let c_arr = arr.clone();
    let w = Watcher::new(
      Source::getter(move || c_arr.get(1)),
      move |_, _| {
        c_runs.set(c_runs.get() + 1);
        Ok(())
      },
      WatchOptions::default().sync(),
    )
    .unwrap();

    set(&value, "01", 5);
    assert_eq!(arr.len(), 2);
    assert_eq!(arr.get(1), Value::from(5));
    assert_eq!(runs.get(), 1);
    w.teardown();
  }

  #[rxwatch_macro::test]
  fn keys_parse_digit_runs_as_indices() {
    assert_eq!(Key::from("12"), Key::Index(12));
    assert_eq!(Key::from("012"), Key::Index(12));
    assert_eq!(Key::from("+1"), Key::Name("+1".into()));
    assert_eq!(Key::from("1.5"), Key::Name("1.5".into()));
    assert_eq!(Key::from("-1"), Key::Name("-1".into()));
    assert_eq!(Key::from("0"), Key::Index(0));
  }
}
