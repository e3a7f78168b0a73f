//! Runs a task with start/stop bookkeeping.
//!
//! Every run:
//!
//! 1. installs a [`FailureLogger`](crate::failure_logger::FailureLogger) as the process-wide panic hook (it stays
//!    installed after the run, and stays silent for panics the run catches);
//! 2. logs the task's start and stop dates and its execution time;
//! 3. hands any failure of the task back to the caller as [`Error::Task`].
//!
//! When the options say so, the run also logs the task's result or failure,
//! plays a sound, and ends the process: exit code 0 if the task succeeded,
//! 1 if it returned an error or panicked.

use crate::caller::CallerInfo;
use crate::error::{Error, Result, TaskPanicked};
use crate::failure_logger::catch_handled;
use crate::logging::Destination;
use crate::options::RunOptions;
use crate::process::{Process, System};
use crate::task::Task;

use log::{Level, Log};

use std::fmt;
use std::io::{self, Write};
use std::time::{Duration, Instant};

pub(crate) const COMPONENT: &str = module_path!();

/// Runs `task` once on the calling thread.
///
/// Returns the task's value (`None` for [`Task::Action`]) unless the task
/// failed. If `options` ask for it, `process` is told to exit before this
/// returns; with the real [`System`] that means it never returns.
pub fn run<T: fmt::Debug>(
    task: Task<'_, T>,
    options: &RunOptions,
    process: &dyn Process,
) -> Result<Option<T>> {
    let run = Run { options };

    process.install_failure_hook(options.failure_logger().clone());

    let start = Instant::now();
    let outcome = match catch_handled(|| {
        run.event(format_args!("task start date = {}", timestamp()));
        run.execute(task)
    }) {
        Ok(outcome) => outcome,
        Err(payload) => Err(TaskPanicked::from_payload(payload).into()),
    };

    if let Err(err) = &outcome {
        if options.exit_when_done() {
            // Nobody will see the error once the process is gone.
            run.problem(&Chain(err));
        }
    }

    run.log_stop(start);
    run.play_sound(process, outcome.is_ok());
    run.see_if_should_exit(process, if outcome.is_ok() { 0 } else { 1 });

    outcome.map_err(Error::Task)
}

struct Run<'o> {
    options: &'o RunOptions,
}

impl<'o> Run<'o> {
    fn event(&self, message: fmt::Arguments) {
        self.options.destination().emit(
            self.options.level(),
            self.options.component(),
            self.options.operation(),
            message,
        );
    }

    fn problem(&self, problem: &dyn fmt::Display) {
        report_problem(
            self.options.destination(),
            self.options.component(),
            self.options.operation(),
            problem,
        );
    }

    fn execute<T: fmt::Debug>(&self, task: Task<'_, T>) -> std::result::Result<Option<T>, failure::Error> {
        let value = task.execute()?;
        if self.options.exit_when_done() {
            if let Some(value) = &value {
                self.event(format_args!("task's result = {:?}", value));
            }
        }
        Ok(value)
    }

    /// Never panics.
    fn log_stop(&self, start: Instant) {
        let elapsed = start.elapsed();
        let logged = catch_handled(|| {
            self.event(format_args!("task stop date = {}", timestamp()));
            self.event(format_args!(
                "task execution time = {} seconds",
                seconds(elapsed)
            ));
        });
        if let Err(payload) = logged {
            self.problem(&TaskPanicked::from_payload(payload).message);
        }
    }

    fn play_sound(&self, process: &dyn Process, succeeded: bool) {
        if succeeded && !self.options.sound_on_success() {
            return;
        }
        if let Err(err) = process.play_sound(succeeded) {
            self.problem(&err);
        }
    }

    /// Never panics; returns only if the process did not exit.
    fn see_if_should_exit(&self, process: &dyn Process, code: i32) {
        if !self.options.exit_when_done() {
            return;
        }
        let announced = catch_handled(|| {
            self.event(format_args!("will next call exit({})", code));
            self.options.destination().flush();
        });
        if let Err(payload) = announced {
            self.problem(&TaskPanicked::from_payload(payload).message);
        }
        match catch_handled(|| process.exit(code)) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.problem(&err),
            Err(payload) => self.problem(&TaskPanicked::from_payload(payload).message),
        }
    }
}

/// Logs `problem` at error level, falling back to stderr if logging itself
/// panics. Never panics.
pub fn report_problem(
    destination: &Destination,
    component: &str,
    operation: &str,
    problem: &dyn fmt::Display,
) {
    let logged = catch_handled(|| {
        destination.emit(
            Level::Error,
            component,
            operation,
            format_args!("UNEXPECTED failure caught: {}", problem),
        )
    });
    if let Err(payload) = logged {
        let reason = TaskPanicked::from_payload(payload).message;
        let _ = catch_handled(|| {
            let stderr = io::stderr();
            let mut err = stderr.lock();
            let _ = writeln!(err);
            let _ = writeln!(err, "THE FOLLOWING FAILURE WAS RAISED:");
            let _ = writeln!(err, "{}", problem);
            let _ = writeln!(err, "BUT IT FAILED TO BE LOGGED DUE TO:");
            let _ = writeln!(err, "{}", reason);
        });
    }
}

fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.3f%z")
        .to_string()
}

fn seconds(elapsed: Duration) -> String {
    format!("{:.9}", elapsed.as_secs_f64())
}

/// Renders an error followed by each of its causes.
struct Chain<'e>(&'e failure::Error);

impl<'e> fmt::Display for Chain<'e> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)?;
        for cause in self.0.iter_causes() {
            write!(f, "\n\tcaused by {}", cause)?;
        }
        Ok(())
    }
}

/// When a run started from a caller should end the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Always return to the caller.
    Continue,
    /// Always end the process.
    Exit,
    /// End the process only when the caller is the program's `main`.
    IfEntryPoint,
}

/// Runs `task` on behalf of whoever called this, using their names in the
/// log records, info-level events, a sound on success, and the real process.
#[inline(never)]
pub fn run_as_caller<T: fmt::Debug>(
    task: Task<'_, T>,
    policy: ExitPolicy,
    destination: Destination,
) -> Result<Option<T>> {
    let caller = CallerInfo::capture()?;
    let exit_when_done = match policy {
        ExitPolicy::Continue => false,
        ExitPolicy::Exit => true,
        ExitPolicy::IfEntryPoint => caller.is_entry_point(),
    };
    let options = RunOptions::from_caller(&caller)
        .level(Level::Info)
        .sound_on_success(true)
        .exit_when_done(exit_when_done)
        .destination(destination)
        .build()?;
    run(task, &options, &System)
}

fn value_of<T>(result: Result<Option<T>>) -> Result<T> {
    result.and_then(|value| {
        value.ok_or_else(|| Error::internal("value-producing task returned nothing"))
    })
}

/// Runs a value-producing task and returns to the caller.
#[inline(never)]
pub fn then_continue<T, F>(f: F) -> Result<T>
where
    T: fmt::Debug,
    F: FnOnce() -> std::result::Result<T, failure::Error>,
{
    value_of(run_as_caller(Task::call(f), ExitPolicy::Continue, Destination::Global))
}

/// [`then_continue`] for a task that produces nothing.
#[inline(never)]
pub fn then_continue_action<F>(f: F) -> Result<()>
where
    F: FnOnce() -> std::result::Result<(), failure::Error>,
{
    run_as_caller::<()>(Task::action(f), ExitPolicy::Continue, Destination::Global).map(|_| ())
}

/// Runs a value-producing task, then exits the process.
#[inline(never)]
pub fn then_exit<T, F>(f: F) -> Result<T>
where
    T: fmt::Debug,
    F: FnOnce() -> std::result::Result<T, failure::Error>,
{
    value_of(run_as_caller(Task::call(f), ExitPolicy::Exit, Destination::Global))
}

/// [`then_exit`] for a task that produces nothing.
#[inline(never)]
pub fn then_exit_action<F>(f: F) -> Result<()>
where
    F: FnOnce() -> std::result::Result<(), failure::Error>,
{
    run_as_caller::<()>(Task::action(f), ExitPolicy::Exit, Destination::Global).map(|_| ())
}

/// Runs a value-producing task, then exits if the caller is the program's
/// entry point. Otherwise returns like [`then_continue`].
#[inline(never)]
pub fn then_exit_if_entry_point<T, F>(f: F) -> Result<T>
where
    T: fmt::Debug,
    F: FnOnce() -> std::result::Result<T, failure::Error>,
{
    value_of(run_as_caller(Task::call(f), ExitPolicy::IfEntryPoint, Destination::Global))
}

/// [`then_exit_if_entry_point`] for a task that produces nothing.
#[inline(never)]
pub fn then_exit_if_entry_point_action<F>(f: F) -> Result<()>
where
    F: FnOnce() -> std::result::Result<(), failure::Error>,
{
    run_as_caller::<()>(Task::action(f), ExitPolicy::IfEntryPoint, Destination::Global)
        .map(|_| ())
}
