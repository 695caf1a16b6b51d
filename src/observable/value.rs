use std::{any::Any, cmp::Ordering, fmt, rc::Rc};

use super::{Array, Object, Observer};

/// A dynamically shaped value that can be made reactive.
///
/// The shape is decided once, where data enters the system: scalars are never
/// observed, `Object` and `Array` are the two container shapes that get
/// reactive properties, and `Opaque` carries anything the runtime must leave
/// alone (framework nodes, foreign handles).
#[derive(Clone, Default)]
pub enum Value {
  #[default]
  Undefined,
  Null,
  Bool(bool),
  Number(f64),
  String(Rc<str>),
  Object(Object),
  Array(Array),
  Opaque(Opaque),
}

/// A value excluded from observation and deep traversal.
#[derive(Clone)]
pub struct Opaque(Rc<dyn Any>);

impl Opaque {
  pub fn new<T: Any>(value: T) -> Self { Opaque(Rc::new(value)) }

  pub fn downcast_ref<T: Any>(&self) -> Option<&T> { self.0.downcast_ref() }

  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl Value {
  /// Strict identity.
  ///
  /// Scalars compare by value with IEEE semantics, so `NaN` is not identical
  /// to itself. Strings compare by content. Containers and opaque values
  /// compare by handle identity, never by contents.
  pub fn same(&self, other: &Value) -> bool {
    match (self, other) {
      (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Number(a), Value::Number(b)) => a == b,
      (Value::String(a), Value::String(b)) => a == b,
      (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
      (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
      (Value::Opaque(a), Value::Opaque(b)) => a.ptr_eq(b),
      _ => false,
    }
  }

  pub fn is_nan(&self) -> bool { matches!(self, Value::Number(n) if n.is_nan()) }

  /// Objects and arrays, the values whose contents can change in place.
  pub fn is_composite(&self) -> bool { matches!(self, Value::Object(_) | Value::Array(_)) }

  pub fn is_undefined(&self) -> bool { matches!(self, Value::Undefined) }

  pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Number(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_object(&self) -> Option<&Object> {
    match self {
      Value::Object(o) => Some(o),
      _ => None,
    }
  }

  pub fn as_array(&self) -> Option<&Array> {
    match self {
      Value::Array(a) => Some(a),
      _ => None,
    }
  }

  /// Truthiness in the usual dynamic-language sense.
  pub fn truthy(&self) -> bool {
    match self {
      Value::Undefined | Value::Null => false,
      Value::Bool(b) => *b,
      Value::Number(n) => *n != 0. && !n.is_nan(),
      Value::String(s) => !s.is_empty(),
      Value::Object(_) | Value::Array(_) | Value::Opaque(_) => true,
    }
  }

  /// The observation marker of a container, if it has been observed.
  pub fn observer(&self) -> Option<Observer> {
    match self {
      Value::Object(o) => o.observer(),
      Value::Array(a) => a.observer(),
      _ => None,
    }
  }

  /// Property access by name, as used by dotted watch paths.
  ///
  /// Reads go through the tracked accessors of the container. Anything that
  /// is not a container yields `Undefined`.
  pub fn get(&self, key: &str) -> Value {
    match self {
      Value::Object(o) => o.get(key),
      Value::Array(a) if key == "length" => Value::Number(a.len() as f64),
      Value::Array(a) => match key.parse::<usize>() {
        Ok(index) => a.get(index),
        Err(_) => Value::Undefined,
      },
      _ => Value::Undefined,
    }
  }

  /// Default ordering used by [`Array::sort`]: numbers ascending, then
  /// strings, then booleans, then everything else; `Undefined` always last.
  pub(crate) fn sort_cmp(&self, other: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
      match v {
        Value::Number(_) => 0,
        Value::String(_) => 1,
        Value::Bool(_) => 2,
        Value::Null => 3,
        Value::Object(_) | Value::Array(_) | Value::Opaque(_) => 4,
        Value::Undefined => 5,
      }
    }
    match (self, other) {
      (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
      (Value::String(a), Value::String(b)) => a.cmp(b),
      (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
      _ => rank(self).cmp(&rank(other)),
    }
  }

  fn fmt_depth(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    const MAX_DEPTH: usize = 4;
    match self {
      Value::Undefined => f.write_str("undefined"),
      Value::Null => f.write_str("null"),
      Value::Bool(b) => write!(f, "{b}"),
      Value::Number(n) => write!(f, "{n}"),
      Value::String(s) => write!(f, "{s:?}"),
      Value::Opaque(_) => f.write_str("<opaque>"),
      Value::Object(_) | Value::Array(_) if depth >= MAX_DEPTH => f.write_str("…"),
      Value::Object(o) => {
        f.write_str("{")?;
        for (i, (key, value)) in o.peek_entries().iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{key}: ")?;
          match value {
            Some(value) => value.fmt_depth(f, depth + 1)?,
            None => f.write_str("<accessor>")?,
          }
        }
        f.write_str("}")
      }
      Value::Array(a) => {
        f.write_str("[")?;
        for (i, value) in a.peek_items().iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          value.fmt_depth(f, depth + 1)?;
        }
        f.write_str("]")
      }
    }
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool { self.same(other) }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.fmt_depth(f, 0) }
}

macro_rules! number_from {
  ($($t: ty),*) => {
    $(
      impl From<$t> for Value {
        #[inline]
        fn from(n: $t) -> Self { Value::Number(n as f64) }
      }
    )*
  };
}
number_from!(i32, i64, u32, u64, usize, f32, f64);

impl From<bool> for Value {
  fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self { Value::String(s.into()) }
}

impl From<String> for Value {
  fn from(s: String) -> Self { Value::String(s.into()) }
}

impl From<Rc<str>> for Value {
  fn from(s: Rc<str>) -> Self { Value::String(s) }
}

impl From<Object> for Value {
  fn from(o: Object) -> Self { Value::Object(o) }
}

impl From<Array> for Value {
  fn from(a: Array) -> Self { Value::Array(a) }
}

impl From<Opaque> for Value {
  fn from(o: Opaque) -> Self { Value::Opaque(o) }
}

impl From<Vec<Value>> for Value {
  fn from(items: Vec<Value>) -> Self { Value::Array(Array::from(items)) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self { v.map_or(Value::Undefined, Into::into) }
}
