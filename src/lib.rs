//! # rxwatch: fine-grained reactive dependency tracking
//!
//! Plain data becomes observable state; watchers record exactly which pieces
//! of that state they read, and re-run in creation order, once per flush,
//! when any of it changes.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use rxwatch::prelude::*;
//!
//! let data: Object = [("count", 1)].into_iter().collect();
//! observe(&data.clone().into());
//!
//! let seen = Rc::new(RefCell::new(vec![]));
//! let c_seen = seen.clone();
//! let c_data = data.clone();
//! watch(
//!   Source::getter(move || c_data.get("count")),
//!   move |new, old| {
//!     c_seen.borrow_mut().push((new.clone(), old.clone()));
//!     Ok(())
//!   },
//!   WatchOptions::default(),
//! )
//! .unwrap();
//!
//! data.assign("count", 2);
//! data.assign("count", 3);
//! assert!(seen.borrow().is_empty());
//!
//! // One flush, one callback, for the whole burst.
//! tick();
//! assert_eq!(*seen.borrow(), vec![(Value::from(3), Value::from(1))]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Value`] | Scalars, observable [`Object`]s and [`Array`]s, opaque values |
//! | [`Subject`] | The subscriber list of one reactive property |
//! | [`Watcher`] | A tracked computation with a change callback |
//! | [`Computed`] | A memoized derived value |
//! | [`WatcherScope`] | A group of watchers torn down together |
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): [`FuturesScheduler`] on a `futures`
//!   local executor
//! - **`tokio-scheduler`**: [`TokioScheduler`] on a tokio `LocalSet`
//!
//! [`Value`]: observable::Value
//! [`Object`]: observable::Object
//! [`Array`]: observable::Array
//! [`Subject`]: subject::Subject
//! [`Watcher`]: watcher::Watcher
//! [`Computed`]: computed::Computed
//! [`WatcherScope`]: scope::WatcherScope
//! [`FuturesScheduler`]: scheduler
//! [`TokioScheduler`]: scheduler

pub mod computed;
pub mod config;
pub mod context;
pub mod error;
pub mod observable;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod scope;
pub mod subject;
pub mod traverse;
pub mod watch;
pub mod watcher;

pub use prelude::*;

#[cfg(all(doctest, not(target_arch = "wasm32")))]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
