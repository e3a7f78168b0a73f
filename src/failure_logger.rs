//! Logs panics that no caller is around to handle.

use crate::logging::Destination;

use human_panic::Metadata;
use log::Level;

use std::cell::Cell;
use std::fmt::{self, Write};
#[allow(deprecated)]
use std::panic::{self, AssertUnwindSafe, PanicInfo};
use std::sync::Arc;
use std::thread::{self, Thread};

const COMPONENT: &str = module_path!();
const OPERATION: &str = "on_panic";
const UNKNOWN: &str = "UNKNOWN (none was supplied)";

thread_local! {
    static HANDLED: Cell<bool> = Cell::new(false);
}

/// Runs `f` and catches its panic, if any. The failure hook stays silent for
/// panics raised on this thread while `f` runs: the caller reports them.
pub(crate) fn catch_handled<R, F: FnOnce() -> R>(f: F) -> thread::Result<R> {
    let previous = HANDLED.with(|handled| handled.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    HANDLED.with(|handled| handled.set(previous));
    result
}

fn handled_here() -> bool {
    HANDLED.try_with(|handled| handled.get()).unwrap_or(false)
}

/// Writes every otherwise uncaught panic to a [`Destination`] at error level.
///
/// Installed as the process-wide panic hook by the runner. Optionally also
/// writes a `human-panic` crash report file.
#[derive(Clone)]
pub struct FailureLogger {
    destination: Destination,
    crash_report: Option<Arc<Metadata>>,
}

impl fmt::Debug for FailureLogger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FailureLogger")
            .field("destination", &self.destination)
            .field("crash_report", &self.crash_report.is_some())
            .finish()
    }
}

impl Default for FailureLogger {
    fn default() -> Self {
        Self::new(Destination::Global)
    }
}

impl FailureLogger {
    /// Logs to `destination`, without crash reports.
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            crash_report: None,
        }
    }

    /// Also writes a `human-panic` report file for each uncaught panic.
    pub fn with_crash_report(mut self, metadata: Arc<Metadata>) -> Self {
        self.crash_report = Some(metadata);
        self
    }

    /// Whether a crash report metadata was configured.
    pub fn writes_crash_report(&self) -> bool {
        self.crash_report.is_some()
    }

    /// Where the panic records go.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Renders the record for one uncaught failure. Either part may be unknown.
    pub fn describe(thread: Option<&Thread>, failure: Option<&dyn fmt::Display>) -> String {
        let mut msg = String::with_capacity(256);
        let _ = writeln!(msg, "AN UNCAUGHT PANIC HAS BEEN DETECTED");
        let _ = msg.write_str("Thread reporting the uncaught panic: ");
        match thread {
            Some(thread) => {
                let _ = writeln!(
                    msg,
                    "name = {}, id = {:?}",
                    thread.name().unwrap_or("unnamed"),
                    thread.id()
                );
            }
            None => {
                let _ = writeln!(msg, "{}", UNKNOWN);
            }
        }
        let _ = msg.write_str("Uncaught panic: ");
        match failure {
            Some(failure) => {
                let _ = write!(msg, "{}", failure);
            }
            None => {
                let _ = msg.write_str(UNKNOWN);
            }
        }
        msg
    }

    /// Logs [`describe`](Self::describe)'s record at error level. Never panics
    /// unless the destination does.
    pub fn report(&self, thread: Option<&Thread>, failure: Option<&dyn fmt::Display>) {
        let msg = Self::describe(thread, failure);
        self.destination
            .emit(Level::Error, COMPONENT, OPERATION, format_args!("{}", msg));
    }

    /// Body of the panic hook. Panics caught by the runner are left to it.
    #[allow(deprecated)]
    pub fn on_panic(&self, info: &PanicInfo) {
        if handled_here() {
            return;
        }
        let mut failure = String::from("panicked at ");
        match info.location() {
            Some(location) => {
                let _ = write!(failure, "{}", location);
            }
            None => failure.push_str("an unknown location"),
        }
        let _ = write!(failure, ": {}", payload_message(info.payload()));
        if backtrace_requested() {
            let _ = write!(failure, "\n{:?}", backtrace::Backtrace::new());
        }

        let current = thread::current();
        self.report(Some(&current), Some(&failure));

        if let Some(metadata) = &self.crash_report {
            if let Some(path) = human_panic::handle_dump(metadata, info) {
                self.destination.emit(
                    Level::Error,
                    COMPONENT,
                    OPERATION,
                    format_args!("crash report written to {}", path.display()),
                );
            }
        }
    }
}

fn payload_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "Box<dyn Any>"
    }
}

fn backtrace_requested() -> bool {
    match std::env::var("RUST_BACKTRACE") {
        Ok(x) => x != "0",
        Err(_) => false,
    }
}
