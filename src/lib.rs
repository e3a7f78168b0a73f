//! Execute, a task runner that keeps the books
//!
//! Wraps a unit of work with start/stop logging, a process-wide panic logger,
//! and optionally an exit code that reflects whether the work succeeded.
//!
//! ```no_run
//! fn main() {
//!     let _ = execute::then_exit_if_entry_point_action(|| {
//!         // whatever main is supposed to do
//!         Ok(())
//!     });
//! }
//! ```

#![deny(missing_docs)]

pub mod caller;
pub mod cli;
pub mod error;
pub mod failure_logger;
pub mod logging;
pub mod options;
pub mod process;
pub mod runner;
pub mod task;

pub use caller::{CallerInfo, Frame};
pub use error::{ConfigErrorKind, Error, Result};
pub use failure_logger::FailureLogger;
pub use logging::Destination;
pub use options::{RunOptions, RunOptionsBuilder};
pub use process::{Process, System};
pub use runner::{
    report_problem, run, run_as_caller, then_continue, then_continue_action, then_exit,
    then_exit_action, then_exit_if_entry_point, then_exit_if_entry_point_action, ExitPolicy,
};
pub use task::Task;
