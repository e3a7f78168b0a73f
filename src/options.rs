//! Per-run configuration.

use crate::caller::CallerInfo;
use crate::error::{ConfigErrorKind, Result};
use crate::failure_logger::FailureLogger;
use crate::logging::Destination;

use human_panic::Metadata;
use log::Level;

use std::sync::Arc;

/// How a single run is logged and whether it ends the process.
///
/// Built through [`RunOptions::builder`]; fixed once built.
#[derive(Debug, Clone)]
pub struct RunOptions {
    component: String,
    operation: String,
    level: Level,
    sound_on_success: bool,
    exit_when_done: bool,
    destination: Destination,
    failure_logger: FailureLogger,
}

impl RunOptions {
    /// Starts a builder with info-level events, no sound on success, no exit
    /// and the global logger.
    pub fn builder<C: Into<String>, O: Into<String>>(component: C, operation: O) -> RunOptionsBuilder {
        RunOptionsBuilder {
            component: component.into(),
            operation: operation.into(),
            level: Level::Info,
            sound_on_success: false,
            exit_when_done: false,
            destination: Destination::Global,
            crash_report: None,
        }
    }

    /// Starts from the caller's names; exits only if the caller is the entry point.
    pub fn from_caller(caller: &CallerInfo) -> RunOptionsBuilder {
        Self::builder(caller.component(), caller.operation()).exit_when_done(caller.is_entry_point())
    }

    /// Target of every record the run writes.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Prefix of every record the run writes.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Level for lifecycle events. Failures are always logged at error.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Whether a successful run plays a sound. Failures always do.
    pub fn sound_on_success(&self) -> bool {
        self.sound_on_success
    }

    /// Whether the run ends the process once the task is done.
    pub fn exit_when_done(&self) -> bool {
        self.exit_when_done
    }

    /// Where the run's records go.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// The panic hook a run installs; it logs to the same destination.
    pub fn failure_logger(&self) -> &FailureLogger {
        &self.failure_logger
    }
}

/// Collects settings for a [`RunOptions`]; see [`RunOptions::builder`].
pub struct RunOptionsBuilder {
    component: String,
    operation: String,
    level: Level,
    sound_on_success: bool,
    exit_when_done: bool,
    destination: Destination,
    crash_report: Option<Arc<Metadata>>,
}

impl RunOptionsBuilder {
    /// Level for start, stop, result and exit records.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Play a sound when the task succeeds too.
    pub fn sound_on_success(mut self, sound_on_success: bool) -> Self {
        self.sound_on_success = sound_on_success;
        self
    }

    /// End the process after the task: 0 on success, 1 on failure.
    pub fn exit_when_done(mut self, exit_when_done: bool) -> Self {
        self.exit_when_done = exit_when_done;
        self
    }

    /// Send records here instead of the global logger.
    pub fn destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Also write a `human-panic` crash report for uncaught panics.
    pub fn crash_report(mut self, metadata: Metadata) -> Self {
        self.crash_report = Some(Arc::new(metadata));
        self
    }

    /// Fails with [`Error::InvalidConfig`](crate::error::Error::InvalidConfig)
    /// if either name is blank.
    pub fn build(self) -> Result<RunOptions> {
        if self.component.trim().is_empty() {
            return Err(ConfigErrorKind::BlankComponent.into());
        }
        if self.operation.trim().is_empty() {
            return Err(ConfigErrorKind::BlankOperation.into());
        }
        let mut failure_logger = FailureLogger::new(self.destination.clone());
        if let Some(metadata) = self.crash_report {
            failure_logger = failure_logger.with_crash_report(metadata);
        }
        Ok(RunOptions {
            failure_logger,
            component: self.component,
            operation: self.operation,
            level: self.level,
            sound_on_success: self.sound_on_success,
            exit_when_done: self.exit_when_done,
            destination: self.destination,
        })
    }
}
