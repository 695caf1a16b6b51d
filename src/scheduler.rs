//! Batched, ordered execution of queued watchers.
//!
//! Watchers notified outside a flush are collected in a queue and run
//! together on the next turn of the installed [`Scheduler`]. Within a flush
//! watchers run in ascending id order, each at most once per notification;
//! watchers queued while the flush is running join it at their sorted place.
//!
//! The flush runs on whatever the installed scheduler treats as "after the
//! current synchronous work". The default [`TickScheduler`] simply keeps a
//! queue that the host drains with [`tick`].

#[cfg(all(feature = "futures-scheduler", not(target_arch = "wasm32")))]
mod futures;
mod tick;
#[cfg(feature = "tokio-scheduler")]
mod tokio;
#[cfg(target_arch = "wasm32")]
mod wasm;

use std::{
  cell::{Cell, RefCell},
  collections::{HashMap, HashSet},
  rc::Rc,
};

#[cfg(all(feature = "futures-scheduler", not(target_arch = "wasm32")))]
pub use self::futures::FuturesScheduler;
pub use self::tick::{tick, TickScheduler};
#[cfg(feature = "tokio-scheduler")]
pub use self::tokio::TokioScheduler;
#[cfg(target_arch = "wasm32")]
pub use self::wasm::WasmScheduler;
use crate::{
  config, context,
  error::ReactiveError,
  watcher::{Watcher, WatcherId},
};

/// Runs deferred work after the current synchronous burst.
pub trait Scheduler {
  fn schedule(&self, task: Box<dyn FnOnce()>);
}

type FlushFn = Rc<dyn Fn(&[WatcherId])>;

#[derive(Default)]
struct QueueState {
  queue: Vec<Watcher>,
  has: HashSet<WatcherId>,
  circular: HashMap<WatcherId, usize>,
  excluded: HashSet<WatcherId>,
  waiting: bool,
  flushing: bool,
  index: usize,
}

thread_local! {
  static SCHEDULER: RefCell<Rc<dyn Scheduler>> = RefCell::new(Rc::new(TickScheduler));
  static QUEUE: RefCell<QueueState> = RefCell::new(QueueState::default());
  static FLUSH_HOOKS: RefCell<Vec<(usize, FlushFn)>> = const { RefCell::new(Vec::new()) };
  static NEXT_HOOK_ID: Cell<usize> = const { Cell::new(0) };
}

/// Install the scheduler used by this thread and return the previous one.
pub fn set_scheduler(scheduler: impl Scheduler + 'static) -> Rc<dyn Scheduler> {
  SCHEDULER.with(|s| std::mem::replace(&mut *s.borrow_mut(), Rc::new(scheduler)))
}

/// Run `f` on the next turn of the installed scheduler. Callbacks run in the
/// order they were requested, interleaved with pending flushes.
pub fn next_tick(f: impl FnOnce() + 'static) {
  let scheduler = SCHEDULER.with(|s| s.borrow().clone());
  scheduler.schedule(Box::new(f));
}

/// Queue `watcher` for the next flush.
///
/// A watcher already waiting is not queued twice. During a flush the watcher
/// is inserted by id into the part of the queue that has not run yet.
pub fn queue_watcher(watcher: Watcher) {
  let id = watcher.id();
  let start_flush = QUEUE.with(|q| {
    let mut q = q.borrow_mut();
    if q.has.contains(&id) || q.excluded.contains(&id) {
      return false;
    }
    q.has.insert(id);
    if q.flushing {
      let mut pos = q.queue.len();
      while pos > q.index + 1 && q.queue[pos - 1].id() > id {
        pos -= 1;
      }
      q.queue.insert(pos, watcher);
    } else {
      q.queue.push(watcher);
    }
    !std::mem::replace(&mut q.waiting, true)
  });

  if start_flush {
    if config::async_flush() {
      next_tick(flush_queue);
    } else {
      flush_queue();
    }
  }
}

/// Whether a flush is running on this thread.
pub fn is_flushing() -> bool { QUEUE.with(|q| q.borrow().flushing) }

/// Watchers queued and not yet run.
pub fn pending_count() -> usize { QUEUE.with(|q| q.borrow().has.len()) }

/// Handle of a hook registered with [`on_flushed`].
#[derive(Debug)]
pub struct FlushHook {
  id: usize,
}

impl FlushHook {
  pub fn remove(self) {
    FLUSH_HOOKS.with(|hooks| hooks.borrow_mut().retain(|(id, _)| *id != self.id));
  }
}

/// Call `hook` after every flush with the ids of the watchers that ran, in
/// run order. The hook stays registered until removed.
pub fn on_flushed(hook: impl Fn(&[WatcherId]) + 'static) -> FlushHook {
  let id = NEXT_HOOK_ID.with(|next| {
    next.set(next.get() + 1);
    next.get()
  });
  FLUSH_HOOKS.with(|hooks| hooks.borrow_mut().push((id, Rc::new(hook))));
  FlushHook { id }
}

/// Resets the queue on every exit path of a flush.
struct ResetOnDrop;

impl Drop for ResetOnDrop {
  fn drop(&mut self) { QUEUE.with(|q| *q.borrow_mut() = QueueState::default()) }
}

fn flush_queue() {
  let queued = QUEUE.with(|q| {
    let mut q = q.borrow_mut();
    q.flushing = true;
    q.queue.sort_by_key(Watcher::id);
    q.queue.len()
  });
  tracing::debug!(queued, "flush start");

  let flushed = {
    let _reset = ResetOnDrop;
    run_queue()
  };

  tracing::debug!(ran = flushed.len(), "flush end");
  let hooks: Vec<FlushFn> =
    FLUSH_HOOKS.with(|h| h.borrow().iter().map(|(_, f)| f.clone()).collect());
  for hook in hooks {
    hook(&flushed);
  }
}

fn run_queue() -> Vec<WatcherId> {
  let limit = config::max_update_count();
  let mut flushed = vec![];
  loop {
    let next = QUEUE.with(|q| {
      let q = q.borrow();
      q.queue.get(q.index).map(|w| (w.clone(), q.excluded.contains(&w.id())))
    });
    let Some((watcher, excluded)) = next else { break };
    let id = watcher.id();

    if !excluded && watcher.is_active() {
      if let Some(before) = watcher.before_hook() {
        context::untracked(|| before());
      }
      QUEUE.with(|q| q.borrow_mut().has.remove(&id));
      tracing::trace!(watcher = id.0, "run");
      if let Err(err) = watcher.run() {
        config::handle_error(&err, &format!("flush of watcher \"{}\"", watcher.expression()));
      }
      flushed.push(id);

      if requeued_too_often(id, limit) {
        tracing::debug!(watcher = id.0, limit, "circular update");
        let err =
          ReactiveError::CircularUpdate { expression: watcher.expression().to_owned(), limit };
        config::handle_error(&err, "scheduler flush");
      }
    }
    QUEUE.with(|q| q.borrow_mut().index += 1);
  }
  flushed
}

/// Count a re-queue that happened while `id` ran; past `limit` the watcher
/// sits out the rest of the flush.
fn requeued_too_often(id: WatcherId, limit: usize) -> bool {
  QUEUE.with(|q| {
    let mut q = q.borrow_mut();
    if !q.has.contains(&id) {
      return false;
    }
    let count = q.circular.entry(id).or_insert(0);
    *count += 1;
    if *count > limit {
      q.has.remove(&id);
      q.excluded.insert(id);
      true
    } else {
      false
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{observable::Value, prelude::*};

  fn logging_watcher(log: &Rc<RefCell<Vec<usize>>>, n: usize) -> Watcher {
    let c_log = log.clone();
    // deep so that every run fires
    Watcher::new(
      Source::getter(|| Value::Null),
      move |_, _| {
        c_log.borrow_mut().push(n);
        Ok(())
      },
      WatchOptions::default().deep(),
    )
    .unwrap()
  }

  #[rxwatch_macro::test]
  fn dedups_and_runs_in_id_order() {
    let log = Rc::new(RefCell::new(vec![]));
    let first = logging_watcher(&log, 1);
    let second = logging_watcher(&log, 2);

    queue_watcher(second.clone());
    queue_watcher(first.clone());
    queue_watcher(second);
    assert_eq!(pending_count(), 2);
    assert!(log.borrow().is_empty());

    tick();
    assert_eq!(*log.borrow(), vec![1, 2]);
    assert_eq!(pending_count(), 0);
    assert!(!is_flushing());
  }

  #[rxwatch_macro::test]
  fn torn_down_watchers_are_skipped() {
    let log = Rc::new(RefCell::new(vec![]));
    let w = logging_watcher(&log, 1);
    queue_watcher(w.clone());
    w.teardown();
    tick();
    assert!(log.borrow().is_empty());
  }

  #[rxwatch_macro::test]
  fn before_hook_runs_first() {
    let log = Rc::new(RefCell::new(vec![]));
    let c_log = log.clone();
    let c_log2 = log.clone();
    let w = Watcher::new(
      Source::getter(|| Value::Null),
      move |_, _| {
        c_log.borrow_mut().push("run");
        Ok(())
      },
      WatchOptions::default().deep().before(move || c_log2.borrow_mut().push("before")),
    )
    .unwrap();
    queue_watcher(w);
    tick();
    assert_eq!(*log.borrow(), vec!["before", "run"]);
  }

  #[rxwatch_macro::test]
  fn flush_hooks_see_ran_ids() {
    let seen = Rc::new(RefCell::new(vec![]));
    let c_seen = seen.clone();
    let hook = on_flushed(move |ids| c_seen.borrow_mut().push(ids.to_vec()));

    let log = Rc::new(RefCell::new(vec![]));
    let w = logging_watcher(&log, 1);
    queue_watcher(w.clone());
    tick();
    assert_eq!(*seen.borrow(), vec![vec![w.id()]]);

    hook.remove();
    queue_watcher(w);
    tick();
    assert_eq!(seen.borrow().len(), 1);
  }

  #[rxwatch_macro::test]
  fn synchronous_flush_when_async_disabled() {
    config::configure(|c| c.async_flush = false);
    let log = Rc::new(RefCell::new(vec![]));
    let w = logging_watcher(&log, 7);
    queue_watcher(w);
    assert_eq!(*log.borrow(), vec![7]);
    config::reset();
  }

  #[rxwatch_macro::test]
  fn next_tick_is_fifo() {
    let order = Rc::new(RefCell::new(vec![]));
    for n in 0..3 {
      let c_order = order.clone();
      next_tick(move || c_order.borrow_mut().push(n));
    }
    assert_eq!(tick(), 3);
    assert_eq!(*order.borrow(), vec![0, 1, 2]);
  }

  #[rxwatch_macro::test]
  fn self_requeueing_watcher_is_cut_off() {
    let circular = Rc::new(Cell::new(0));
    let c_circular = circular.clone();
    config::configure(|c| {
      c.max_update_count = 5;
      c.error_handler = Some(Rc::new(move |e: &ReactiveError, _: &str| {
        if e.is_circular() {
          c_circular.set(c_circular.get() + 1);
        }
      }))
    });

    let runs = Rc::new(Cell::new(0));
    let slot: Rc<RefCell<Option<Watcher>>> = Rc::new(RefCell::new(None));
    let (c_runs, c_slot) = (runs.clone(), slot.clone());
    let w = Watcher::new(
      Source::getter(|| Value::Null),
      move |_, _| {
        c_runs.set(c_runs.get() + 1);
        let me = c_slot.borrow().clone();
        if let Some(me) = me {
          queue_watcher(me);
        }
        Ok(())
      },
      WatchOptions::default().deep(),
    )
    .unwrap();
    *slot.borrow_mut() = Some(w.clone());

    queue_watcher(w);
    tick();
    assert_eq!(runs.get(), 6);
    assert_eq!(circular.get(), 1);
    assert!(!is_flushing());
    config::reset();
    slot.borrow_mut().take();
  }
}
