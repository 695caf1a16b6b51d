use std::{fmt, rc::Rc};

use indexmap::IndexMap;

use super::{
  define_reactive,
  property::{GetFn, ReactiveProperty, SetFn},
  Observer, Value,
};
use crate::{
  context,
  rc::{MutRc, RcDeref, RcDerefMut},
  subject::Subject,
};

/// A shared, insertion-ordered keyed structure.
///
/// Cloning an `Object` clones the handle: both clones see the same
/// properties, and [`Value::same`] treats them as identical.
#[derive(Clone, Default)]
pub struct Object(MutRc<ObjectData>);

pub(crate) struct ObjectData {
  pub(crate) props: IndexMap<Rc<str>, Property>,
  pub(crate) observer: Option<Observer>,
  pub(crate) extensible: bool,
  pub(crate) raw: bool,
}

impl Default for ObjectData {
  fn default() -> Self {
    ObjectData { props: IndexMap::new(), observer: None, extensible: true, raw: false }
  }
}

#[derive(Clone)]
pub(crate) struct Property {
  pub(crate) slot: Slot,
  pub(crate) configurable: bool,
  pub(crate) enumerable: bool,
  pub(crate) writable: bool,
}

#[derive(Clone)]
pub(crate) enum Slot {
  Data(Value),
  Accessor { get: Option<GetFn>, set: Option<SetFn> },
  Reactive(Rc<ReactiveProperty>),
}

/// Attributes of a property, see [`Object::define_property`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
  pub configurable: bool,
  pub enumerable: bool,
  pub writable: bool,
}

impl Default for Descriptor {
  fn default() -> Self { Descriptor { configurable: true, enumerable: true, writable: true } }
}

impl Descriptor {
  pub fn non_configurable(mut self) -> Self {
    self.configurable = false;
    self
  }

  pub fn non_enumerable(mut self) -> Self {
    self.enumerable = false;
    self
  }

  pub fn read_only(mut self) -> Self {
    self.writable = false;
    self
  }
}

enum Write {
  Store,
  Insert,
  Setter(SetFn),
  Reactive(Rc<ReactiveProperty>),
  Ignore,
}

enum Read {
  Value(Value),
  Getter(GetFn),
  Reactive(Rc<ReactiveProperty>),
}

impl Object {
  pub fn new() -> Self { Self::default() }

  // ==== Reads ====

  /// Read a property. Reactive properties register the read with the
  /// evaluating watcher; a missing key reads as `Undefined`.
  pub fn get(&self, key: &str) -> Value {
    let read = {
      let data = self.0.rc_deref();
      match data.props.get(key).map(|p| &p.slot) {
        None => return Value::Undefined,
        Some(Slot::Data(v)) => Read::Value(v.clone()),
        Some(Slot::Accessor { get: Some(get), .. }) => Read::Getter(get.clone()),
        Some(Slot::Accessor { get: None, .. }) => Read::Value(Value::Undefined),
        Some(Slot::Reactive(cell)) => Read::Reactive(cell.clone()),
      }
    };
    match read {
      Read::Value(v) => v,
      Read::Getter(get) => get(),
      Read::Reactive(cell) => cell.get(),
    }
  }

  /// [`Object::get`] with dependency collection suspended.
  pub fn peek(&self, key: &str) -> Value { context::untracked(|| self.get(key)) }

  /// Enumerable own keys in insertion order.
  pub fn keys(&self) -> Vec<Rc<str>> {
    self.track_structure();
    let data = self.0.rc_deref();
    data.props.iter().filter(|(_, p)| p.enumerable).map(|(k, _)| k.clone()).collect()
  }

  pub fn len(&self) -> usize {
    self.track_structure();
    self.0.rc_deref().props.values().filter(|p| p.enumerable).count()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// Whether `key` is an own property, enumerable or not.
  pub fn has(&self, key: &str) -> bool {
    self.track_structure();
    self.0.rc_deref().props.contains_key(key)
  }

  /// Enumerable entries, each value read as by [`Object::get`].
  pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
    self
      .keys()
      .into_iter()
      .map(|k| {
        let v = self.get(&k);
        (k, v)
      })
      .collect()
  }

  /// Untracked snapshot for formatting. `None` marks an accessor whose getter
  /// is left uncalled.
  pub(crate) fn peek_entries(&self) -> Vec<(Rc<str>, Option<Value>)> {
    let Some(data) = self.0.try_rc_deref() else { return vec![] };
    data
      .props
      .iter()
      .filter(|(_, p)| p.enumerable)
      .map(|(k, p)| {
        let v = match &p.slot {
          Slot::Data(v) => Some(v.clone()),
          Slot::Accessor { .. } => None,
          Slot::Reactive(cell) => cell.peek(),
        };
        (k.clone(), v)
      })
      .collect()
  }

  // ==== Writes ====

  /// Ordinary assignment.
  ///
  /// Reactive properties go through their setter and notify. Getter-only
  /// accessors and read-only data ignore the write. A new key on an
  /// extensible object becomes a plain data property, which nothing tracks;
  /// use [`set`](crate::observable::set) to add a reactive key. Returns
  /// whether the write was accepted.
  pub fn assign(&self, key: &str, value: impl Into<Value>) -> bool {
    let value = value.into();
    let write = {
      let data = self.0.rc_deref();
      match data.props.get(key) {
        Some(p) => match &p.slot {
          Slot::Reactive(cell) => Write::Reactive(cell.clone()),
          Slot::Accessor { set: Some(set), .. } => Write::Setter(set.clone()),
          Slot::Accessor { set: None, .. } => Write::Ignore,
          Slot::Data(_) if p.writable => Write::Store,
          Slot::Data(_) => Write::Ignore,
        },
        None if data.extensible => Write::Insert,
        None => Write::Ignore,
      }
    };
    match write {
      Write::Store => {
        if let Some(p) = self.0.rc_deref_mut().props.get_mut(key) {
          p.slot = Slot::Data(value);
        }
      }
      Write::Insert => {
        let prop = Property {
          slot: Slot::Data(value),
          configurable: true,
          enumerable: true,
          writable: true,
        };
        self.0.rc_deref_mut().props.insert(key.into(), prop);
      }
      Write::Setter(set) => set(value),
      Write::Reactive(cell) => cell.set(value),
      Write::Ignore => return false,
    }
    true
  }

  /// Remove a configurable own property. Returns false only when the key
  /// exists and cannot be removed.
  pub fn delete(&self, key: &str) -> bool {
    let mut data = self.0.rc_deref_mut();
    match data.props.get(key) {
      None => true,
      Some(p) if !p.configurable => false,
      Some(_) => {
        data.props.shift_remove(key);
        true
      }
    }
  }

  /// Define (or redefine) a data property with explicit attributes.
  ///
  /// Fails on a non-configurable existing key, or a new key on a
  /// non-extensible object.
  pub fn define_property(&self, key: &str, value: impl Into<Value>, desc: Descriptor) -> bool {
    self.define_slot(key, Slot::Data(value.into()), desc)
  }

  /// Define a getter-only accessor. Writes to it are ignored.
  pub fn define_getter(&self, key: &str, get: impl Fn() -> Value + 'static) -> bool {
    let slot = Slot::Accessor { get: Some(Rc::new(get)), set: None };
    self.define_slot(key, slot, Descriptor::default())
  }

  pub fn define_accessor(
    &self, key: &str, get: impl Fn() -> Value + 'static, set: impl Fn(Value) + 'static,
  ) -> bool {
    let slot = Slot::Accessor { get: Some(Rc::new(get)), set: Some(Rc::new(set)) };
    self.define_slot(key, slot, Descriptor::default())
  }

  fn define_slot(&self, key: &str, slot: Slot, desc: Descriptor) -> bool {
    let mut data = self.0.rc_deref_mut();
    match data.props.get(key) {
      Some(p) if !p.configurable => return false,
      None if !data.extensible => return false,
      _ => {}
    }
    let prop = Property {
      slot,
      configurable: desc.configurable,
      enumerable: desc.enumerable,
      writable: desc.writable,
    };
    data.props.insert(key.into(), prop);
    true
  }

  // ==== Integrity ====

  /// No new keys, no removals, no writes to data properties.
  pub fn freeze(&self) {
    let mut data = self.0.rc_deref_mut();
    data.extensible = false;
    for p in data.props.values_mut() {
      p.configurable = false;
      p.writable = false;
    }
  }

  /// No new keys, no removals.
  pub fn seal(&self) {
    let mut data = self.0.rc_deref_mut();
    data.extensible = false;
    for p in data.props.values_mut() {
      p.configurable = false;
    }
  }

  pub fn prevent_extensions(&self) { self.0.rc_deref_mut().extensible = false; }

  pub fn is_extensible(&self) -> bool { self.0.rc_deref().extensible }

  pub fn is_frozen(&self) -> bool {
    let data = self.0.rc_deref();
    !data.extensible
      && data.props.values().all(|p| {
        !p.configurable && (!matches!(p.slot, Slot::Data(_)) || !p.writable)
      })
  }

  /// Exclude this object from observation, traversal and the mutation
  /// helpers.
  pub fn mark_raw(&self) { self.0.rc_deref_mut().raw = true; }

  pub fn is_raw(&self) -> bool { self.0.rc_deref().raw }

  // ==== Observation ====

  pub fn observer(&self) -> Option<Observer> { self.0.rc_deref().observer.clone() }

  /// Whether `key` is backed by a reactive property.
  pub fn is_reactive(&self, key: &str) -> bool {
    matches!(self.0.rc_deref().props.get(key).map(|p| &p.slot), Some(Slot::Reactive(_)))
  }

  /// The subject of a reactive property.
  pub fn property_subject(&self, key: &str) -> Option<Subject> {
    match self.0.rc_deref().props.get(key).map(|p| &p.slot) {
      Some(Slot::Reactive(cell)) => Some(cell.subject().clone()),
      _ => None,
    }
  }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { self.0.ptr_eq(&other.0) }

  #[inline]
  pub(crate) fn addr(&self) -> usize { self.0.addr() }

  pub(crate) fn inner(&self) -> &MutRc<ObjectData> { &self.0 }

  /// Attach a marker and convert every enumerable key. The marker is set
  /// before walking so self references resolve to it.
  pub(crate) fn observe(&self) -> Option<Observer> {
    {
      let data = self.0.rc_deref();
      if let Some(ob) = &data.observer {
        return Some(ob.clone());
      }
      if data.raw || !data.extensible || !super::is_observing() {
        return None;
      }
    }
    let ob = Observer::new();
    self.0.rc_deref_mut().observer = Some(ob.clone());
    let keys: Vec<Rc<str>> = {
      let data = self.0.rc_deref();
      data
        .props
        .iter()
        .filter(|(_, p)| p.enumerable && !matches!(p.slot, Slot::Reactive(_)))
        .map(|(k, _)| k.clone())
        .collect()
    };
    for key in keys {
      define_reactive(self, &key, None);
    }
    Some(ob)
  }

  fn track_structure(&self) {
    if context::is_tracking() {
      let ob = self.observer();
      if let Some(ob) = ob {
        ob.subject().depend();
      }
    }
  }
}

impl<K: Into<Rc<str>>, V: Into<Value>> FromIterator<(K, V)> for Object {
  fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
    let obj = Object::new();
    {
      let mut data = obj.0.rc_deref_mut();
      for (k, v) in iter {
        let prop = Property {
          slot: Slot::Data(v.into()),
          configurable: true,
          enumerable: true,
          writable: true,
        };
        data.props.insert(k.into(), prop);
      }
    }
    obj
  }
}

impl fmt::Debug for Object {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(&Value::Object(self.clone()), f)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxwatch_macro::test]
  fn plain_assign_and_delete() {
    let o = Object::new();
    assert!(o.assign("a", 1));
    assert_eq!(o.get("a"), Value::from(1));
    assert!(o.delete("a"));
    assert!(!o.has("a"));
    assert!(o.delete("missing"));
  }

  #[rxwatch_macro::test]
  fn getter_only_accessor_ignores_writes() {
    let o = Object::new();
    o.define_getter("answer", || Value::from(42));
    assert!(!o.assign("answer", 1));
    assert_eq!(o.get("answer"), Value::from(42));
  }

  #[rxwatch_macro::test]
  fn frozen_objects_reject_changes() {
    let o: Object = [("a", 1)].into_iter().collect();
    o.freeze();
    assert!(o.is_frozen());
    assert!(!o.assign("a", 2));
    assert!(!o.assign("b", 2));
    assert!(!o.delete("a"));
    assert_eq!(o.get("a"), Value::from(1));
  }

  #[rxwatch_macro::test]
  fn sealed_objects_keep_writable_data() {
    let o: Object = [("a", 1)].into_iter().collect();
    o.seal();
    assert!(!o.is_frozen());
    assert!(o.assign("a", 2));
    assert!(!o.assign("b", 2));
  }

  #[rxwatch_macro::test]
  fn non_configurable_cannot_be_redefined() {
    let o = Object::new();
    o.define_property("k", 1, Descriptor::default().non_configurable());
    assert!(!o.define_property("k", 2, Descriptor::default()));
    assert!(!o.delete("k"));
  }

  #[rxwatch_macro::test]
  fn keys_skip_non_enumerable() {
    let o: Object = [("a", 1), ("b", 2)].into_iter().collect();
    o.define_property("hidden", 3, Descriptor::default().non_enumerable());
    assert_eq!(o.keys(), vec![Rc::from("a"), Rc::from("b")]);
    assert!(o.has("hidden"));
    assert_eq!(o.len(), 2);
  }
}
