//! Watchers: computations that know what they read.
//!
//! A [`Watcher`] evaluates its [`Source`] with itself installed as the
//! current target, so every reactive read registers a dependency. After each
//! evaluation the subscriptions are reconciled against what was actually
//! read: new subjects are subscribed to, subjects no longer read are dropped.
//! When any dependency changes, [`Watcher::update`] marks it dirty (lazy),
//! runs it on the spot (sync) or queues it with the scheduler.

mod getter;
mod options;

use std::{
  cell::RefCell,
  fmt, mem,
  rc::Rc,
  sync::atomic::{AtomicUsize, Ordering},
};

pub use getter::{parse_path, Source};
use indexmap::IndexMap;
pub use options::WatchOptions;

use self::getter::Getter;
use crate::{
  config, context,
  error::{ReactiveError, Result},
  observable::Value,
  scheduler,
  scope::{WatcherScope, WeakScope},
  subject::{Subject, SubjectId},
  traverse::traverse,
};

/// Process-unique watcher identity. Creation order is flush order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(pub usize);

static NEXT_WATCHER_ID: AtomicUsize = AtomicUsize::new(1);

impl WatcherId {
  fn next() -> Self { WatcherId(NEXT_WATCHER_ID.fetch_add(1, Ordering::Relaxed)) }
}

/// Change callback, called with `(new, old)`.
pub type Callback = Rc<dyn Fn(&Value, &Value) -> anyhow::Result<()>>;

#[derive(Clone)]
pub struct Watcher(Rc<WatcherInner>);

struct WatcherInner {
  id: WatcherId,
  expression: String,
  getter: Getter,
  callback: Callback,
  deep: bool,
  user: bool,
  lazy: bool,
  sync: bool,
  before: Option<Rc<dyn Fn()>>,
  scope: Option<WeakScope>,
  state: RefCell<WatcherState>,
}

struct WatcherState {
  value: Value,
  dirty: bool,
  active: bool,
  deps: IndexMap<SubjectId, Subject>,
  new_deps: IndexMap<SubjectId, Subject>,
}

impl Watcher {
  /// Create a watcher and, unless it is lazy, evaluate it once.
  ///
  /// An evaluation error of a non-user watcher tears the watcher down and is
  /// returned.
  pub fn new<F>(source: Source, callback: F, options: WatchOptions) -> Result<Watcher>
  where
    F: Fn(&Value, &Value) -> anyhow::Result<()> + 'static,
  {
    Self::create(None, source, Rc::new(callback), options)
  }

  /// [`Watcher::new`], registered with `scope`.
  pub fn new_in<F>(
    scope: &WatcherScope, source: Source, callback: F, options: WatchOptions,
  ) -> Result<Watcher>
  where
    F: Fn(&Value, &Value) -> anyhow::Result<()> + 'static,
  {
    Self::create(Some(scope), source, Rc::new(callback), options)
  }

  pub(crate) fn create(
    scope: Option<&WatcherScope>, source: Source, callback: Callback, options: WatchOptions,
  ) -> Result<Watcher> {
    let watcher = Self::construct(scope, source, callback, options);
    if !watcher.0.lazy {
      match watcher.get() {
        Ok(value) => watcher.0.state.borrow_mut().value = value,
        Err(err) => {
          watcher.teardown();
          return Err(err);
        }
      }
    }
    Ok(watcher)
  }

  /// Build and register without evaluating.
  pub(crate) fn construct(
    scope: Option<&WatcherScope>, source: Source, callback: Callback, options: WatchOptions,
  ) -> Watcher {
    let expression = source.expression();
    let watcher = Watcher(Rc::new(WatcherInner {
      id: WatcherId::next(),
      expression,
      getter: source.resolve(),
      callback,
      deep: options.deep,
      user: options.user,
      lazy: options.lazy,
      sync: options.sync,
      before: options.before,
      scope: scope.map(WatcherScope::downgrade),
      state: RefCell::new(WatcherState {
        value: Value::Undefined,
        dirty: options.lazy,
        active: true,
        deps: IndexMap::new(),
        new_deps: IndexMap::new(),
      }),
    }));
    if let Some(scope) = scope {
      scope.register(watcher.clone());
    }
    tracing::trace!(watcher = watcher.0.id.0, expression = %watcher.0.expression, "created");
    watcher
  }

  // ==== Evaluation ====

  /// Evaluate the source and recollect dependencies.
  ///
  /// A user watcher reports evaluator errors to the error handler and yields
  /// `Undefined`; any other watcher returns them.
  pub fn get(&self) -> Result<Value> {
    let result = {
      let _guard = context::push_target(Some(self.clone()));
      let result = self.0.getter.call();
      if self.0.deep {
        if let Ok(value) = &result {
          traverse(value);
        }
      }
      result
    };
    self.cleanup_deps();

    result.or_else(|source| {
      let err = ReactiveError::Getter { expression: self.0.expression.clone(), source };
      if self.0.user {
        config::handle_error(&err, &format!("getter for watcher \"{}\"", self.0.expression));
        Ok(Value::Undefined)
      } else {
        Err(err)
      }
    })
  }

  /// Record `subject` as read in the current evaluation.
  pub(crate) fn add_dep(&self, subject: &Subject) {
    let id = subject.id();
    let subscribe = {
      let mut state = self.0.state.borrow_mut();
      if !state.active || state.new_deps.contains_key(&id) {
        return;
      }
      state.new_deps.insert(id, subject.clone());
      !state.deps.contains_key(&id)
    };
    if subscribe {
      subject.add_sub(self.clone());
    }
  }

  /// Drop subscriptions to subjects the last evaluation did not read and
  /// promote the new dependency set.
  fn cleanup_deps(&self) {
    let stale: Vec<Subject> = {
      let mut state = self.0.state.borrow_mut();
      let new_deps = mem::take(&mut state.new_deps);
      let old_deps = mem::replace(&mut state.deps, new_deps);
      old_deps
        .into_iter()
        .filter(|(id, _)| !state.deps.contains_key(id))
        .map(|(_, subject)| subject)
        .collect()
    };
    for subject in stale {
      subject.remove_sub(self.0.id);
    }
  }

  /// React to a dependency change.
  pub fn update(&self) {
    if self.0.lazy {
      self.0.state.borrow_mut().dirty = true;
    } else if self.0.sync {
      if let Err(err) = self.run() {
        config::handle_error(&err, &format!("sync update of watcher \"{}\"", self.0.expression));
      }
    } else {
      scheduler::queue_watcher(self.clone());
    }
  }

  /// Re-evaluate and fire the callback if the value changed.
  ///
  /// Objects and arrays always count as changed, since they may have been
  /// mutated in place. Deep watchers always fire.
  pub fn run(&self) -> Result<()> {
    if !self.is_active() {
      return Ok(());
    }
    let value = self.get()?;
    let old = {
      let mut state = self.0.state.borrow_mut();
      let changed = !value.same(&state.value) || value.is_composite() || self.0.deep;
      if !changed {
        return Ok(());
      }
      mem::replace(&mut state.value, value.clone())
    };
    self.invoke_callback(&value, &old, &format!("callback for watcher \"{}\"", self.0.expression))
  }

  /// Call the change callback outside any tracking context. Errors of user
  /// watchers go to the error handler under `info`.
  pub(crate) fn invoke_callback(&self, new: &Value, old: &Value, info: &str) -> Result<()> {
    let result = context::untracked(|| (self.0.callback)(new, old));
    result.or_else(|source| {
      let err = ReactiveError::Callback { expression: self.0.expression.clone(), source };
      if self.0.user {
        config::handle_error(&err, info);
        Ok(())
      } else {
        Err(err)
      }
    })
  }

  /// Force evaluation of a lazy watcher and clear its dirty flag.
  pub fn evaluate(&self) -> Result<Value> {
    let value = self.get()?;
    let mut state = self.0.state.borrow_mut();
    state.value = value.clone();
    state.dirty = false;
    Ok(value)
  }

  /// Make the currently evaluating watcher depend on everything this watcher
  /// depends on.
  pub fn depend(&self) {
    let deps: Vec<Subject> = self.0.state.borrow().deps.values().cloned().collect();
    for subject in deps {
      subject.depend();
    }
  }

  /// Unsubscribe from every dependency and go inert. Idempotent.
  pub fn teardown(&self) {
    let deps = {
      let mut state = self.0.state.borrow_mut();
      if !state.active {
        return;
      }
      state.active = false;
      let mut deps = mem::take(&mut state.deps);
      deps.extend(mem::take(&mut state.new_deps));
      deps
    };
    if let Some(scope) = self.0.scope.as_ref().and_then(WeakScope::upgrade) {
      if !scope.is_being_destroyed() {
        scope.remove(self.0.id);
      }
    }
    for subject in deps.values() {
      subject.remove_sub(self.0.id);
    }
    tracing::trace!(watcher = self.0.id.0, "torn down");
  }

  // ==== Accessors ====

  #[inline]
  pub fn id(&self) -> WatcherId { self.0.id }

  pub fn expression(&self) -> &str { &self.0.expression }

  /// The value of the last evaluation.
  pub fn value(&self) -> Value { self.0.state.borrow().value.clone() }

  pub fn is_dirty(&self) -> bool { self.0.state.borrow().dirty }

  pub fn is_active(&self) -> bool { self.0.state.borrow().active }

  pub fn is_lazy(&self) -> bool { self.0.lazy }

  pub fn is_sync(&self) -> bool { self.0.sync }

  pub fn is_deep(&self) -> bool { self.0.deep }

  pub fn is_user(&self) -> bool { self.0.user }

  /// Subjects read by the last evaluation, in first-read order.
  pub fn dependency_ids(&self) -> Vec<SubjectId> {
    self.0.state.borrow().deps.keys().copied().collect()
  }

  pub(crate) fn before_hook(&self) -> Option<Rc<dyn Fn()>> { self.0.before.clone() }
}

impl PartialEq for Watcher {
  fn eq(&self, other: &Self) -> bool { self.0.id == other.0.id }
}

impl Eq for Watcher {}

impl fmt::Debug for Watcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.0.state.try_borrow();
    let mut s = f.debug_struct("Watcher");
    s.field("id", &self.0.id.0).field("expression", &self.0.expression);
    if let Ok(state) = state {
      s.field("active", &state.active)
        .field("dirty", &state.dirty)
        .field("deps", &state.deps.len());
    }
    s.finish()
  }
}
