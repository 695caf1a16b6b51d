use super::Scheduler;

/// Runs each task as a microtask of the JavaScript event loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct WasmScheduler;

impl Scheduler for WasmScheduler {
  fn schedule(&self, task: Box<dyn FnOnce()>) {
    wasm_bindgen_futures::spawn_local(async move { task() });
  }
}
