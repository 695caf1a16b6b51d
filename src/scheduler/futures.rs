use std::{cell::RefCell, rc::Rc};

use futures::{executor::LocalSpawner, task::LocalSpawnExt};

use super::Scheduler;

/// Runs each task as a future on a `futures` local executor.
///
/// ```rust
/// # use futures::executor::LocalPool;
/// # use rxwatch::scheduler::{next_tick, set_scheduler, FuturesScheduler};
/// let mut pool = LocalPool::new();
/// set_scheduler(FuturesScheduler::new(pool.spawner()));
/// next_tick(|| println!("deferred"));
/// pool.run_until_stalled();
/// ```
#[derive(Clone)]
pub struct FuturesScheduler(LocalSpawner);

impl FuturesScheduler {
  pub fn new(spawner: LocalSpawner) -> Self { FuturesScheduler(spawner) }
}

impl Scheduler for FuturesScheduler {
  fn schedule(&self, task: Box<dyn FnOnce()>) {
    let slot = Rc::new(RefCell::new(Some(task)));
    let c_slot = slot.clone();
    let spawned = self.0.spawn_local(async move {
      let task = c_slot.borrow_mut().take();
      if let Some(task) = task {
        task();
      }
    });
    if let Err(err) = spawned {
      tracing::warn!(%err, "executor is shut down, running task in place");
      let task = slot.borrow_mut().take();
      if let Some(task) = task {
        task();
      }
    }
  }
}
