//! Deep traversal for `deep` watchers.

use std::collections::HashSet;

use crate::{
  observable::{Observer, Value},
  subject::SubjectId,
};

/// Containers already visited during one traversal.
#[derive(Default)]
struct Seen {
  observed: HashSet<SubjectId>,
  unobserved: HashSet<usize>,
}

impl Seen {
  fn first_visit(&mut self, observer: Option<Observer>, addr: usize) -> bool {
    match observer {
      Some(ob) => self.observed.insert(ob.subject().id()),
      None => self.unobserved.insert(addr),
    }
  }
}

/// Read every nested property of `value` so the evaluating watcher depends on
/// all of it.
///
/// Frozen, raw and opaque values are not entered. Each container is visited
/// once per call, which makes cyclic graphs safe; nothing is remembered
/// between calls.
pub fn traverse(value: &Value) {
  let mut seen = Seen::default();
  walk(value, &mut seen);
}

fn walk(value: &Value, seen: &mut Seen) {
  match value {
    Value::Object(obj) => {
      if obj.is_frozen() || obj.is_raw() || !seen.first_visit(obj.observer(), obj.addr()) {
        return;
      }
      for key in obj.keys() {
        walk(&obj.get(&key), seen);
      }
    }
    Value::Array(arr) => {
      if arr.is_frozen() || arr.is_raw() || !seen.first_visit(arr.observer(), arr.addr()) {
        return;
      }
      for item in arr.to_vec() {
        walk(&item, seen);
      }
    }
    _ => {}
  }
}
