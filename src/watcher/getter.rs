use std::{any, fmt, rc::Rc};

use crate::{config, observable::Value};

type Evaluator = Rc<dyn Fn() -> anyhow::Result<Value>>;

/// What a watcher evaluates.
#[derive(Clone)]
pub enum Source {
  /// A closure reading reactive state.
  Getter { f: Evaluator, label: Rc<str> },
  /// A dotted property path resolved against `root`, e.g. `"a.b.c"`.
  Path { root: Value, path: Rc<str> },
}

impl Source {
  pub fn getter<F>(f: F) -> Self
  where
    F: Fn() -> Value + 'static,
  {
    Source::Getter { f: Rc::new(move || Ok(f())), label: any::type_name::<F>().into() }
  }

  /// A getter that can fail. How a failure is handled depends on the
  /// watcher's `user` flag.
  pub fn try_getter<F>(f: F) -> Self
  where
    F: Fn() -> anyhow::Result<Value> + 'static,
  {
    Source::Getter { f: Rc::new(f), label: any::type_name::<F>().into() }
  }

  pub fn path(root: impl Into<Value>, path: impl Into<Rc<str>>) -> Self {
    Source::Path { root: root.into(), path: path.into() }
  }

  /// Replace the label a getter is reported under.
  pub fn named(self, name: impl Into<Rc<str>>) -> Self {
    match self {
      Source::Getter { f, .. } => Source::Getter { f, label: name.into() },
      path => path,
    }
  }

  /// Human readable description used in diagnostics.
  pub fn expression(&self) -> String {
    match self {
      Source::Getter { label, .. } => label.to_string(),
      Source::Path { path, .. } => path.to_string(),
    }
  }

  pub(crate) fn resolve(self) -> Getter {
    match self {
      Source::Getter { f, .. } => Getter::Func(f),
      Source::Path { root, path } => match parse_path(&path) {
        Some(segments) => Getter::Path { root, segments },
        None => {
          config::warn(format_args!(
            "Failed watching path: \"{path}\" Watcher only accepts simple dot-delimited paths. \
             For full control, use a function instead."
          ));
          Getter::Noop
        }
      },
    }
  }
}

impl fmt::Debug for Source {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Source::Getter { label, .. } => f.debug_tuple("Getter").field(label).finish(),
      Source::Path { path, .. } => f.debug_tuple("Path").field(path).finish(),
    }
  }
}

/// Split a dotted path into its segments. Anything other than word
/// characters, `$` and `.` is rejected.
pub fn parse_path(path: &str) -> Option<Vec<Rc<str>>> {
  let simple = path.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.'));
  simple.then(|| path.split('.').map(Rc::from).collect())
}

pub(crate) enum Getter {
  Func(Evaluator),
  Path { root: Value, segments: Vec<Rc<str>> },
  Noop,
}

impl Getter {
  pub(crate) fn call(&self) -> anyhow::Result<Value> {
    match self {
      Getter::Func(f) => f(),
      Getter::Path { root, segments } => {
        Ok(segments.iter().fold(root.clone(), |value, seg| value.get(seg)))
      }
      Getter::Noop => Ok(Value::Undefined),
    }
  }
}
