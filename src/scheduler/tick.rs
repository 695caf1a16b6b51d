use std::{cell::RefCell, collections::VecDeque};

use super::Scheduler;

thread_local! {
  static TASKS: RefCell<VecDeque<Box<dyn FnOnce()>>> = const { RefCell::new(VecDeque::new()) };
}

/// The default scheduler: tasks wait in a thread-local queue until the host
/// calls [`tick`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TickScheduler;

impl Scheduler for TickScheduler {
  fn schedule(&self, task: Box<dyn FnOnce()>) { TASKS.with(|t| t.borrow_mut().push_back(task)) }
}

/// Run every task queued on this thread's [`TickScheduler`], including tasks
/// queued by the tasks themselves. Returns how many ran.
pub fn tick() -> usize {
  let mut ran = 0;
  loop {
    let task = TASKS.with(|t| t.borrow_mut().pop_front());
    let Some(task) = task else { break };
    task();
    ran += 1;
  }
  ran
}
