//! The reference `trace-core` collector backend: a Catapult/Chrome-Trace
//! JSON writer driven by a dedicated writer thread and fed through a
//! blocking queue.
//!
//! ```no_run
//! use trace_chrome::{ChromeCollector, env::Sink};
//! use trace_core::{dispatch, Collector};
//!
//! let collector = ChromeCollector::open(Sink::Stdout).unwrap();
//! dispatch::install(collector);
//! // ... instrumented code runs, calling into `dispatch::get()` ...
//! dispatch::shutdown();
//! ```
//!
//! Or, for the `TRACE`-environment-variable convenience path:
//!
//! ```no_run
//! trace_chrome::env::install_from_env().unwrap();
//! ```

pub mod backend;
pub mod env;
pub mod error;
pub mod event;
pub mod json;

pub use backend::ChromeCollector;
pub use error::BackendError;
