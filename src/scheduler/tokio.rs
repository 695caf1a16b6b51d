use super::Scheduler;

/// Runs each task with `tokio::task::spawn_local`.
///
/// Scheduling panics outside a `tokio::task::LocalSet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
  fn schedule(&self, task: Box<dyn FnOnce()>) {
    ::tokio::task::spawn_local(async move { task() });
  }
}
