//! Errors the runner hands back to its caller.

use failure::Fail;
use std::any::Any;
use std::fmt;

/// Reasons a set of run options can be rejected.
#[derive(Debug, Fail, PartialEq, Eq, Clone, Copy)]
pub enum ConfigErrorKind {
    /// The component name was empty or whitespace.
    #[fail(display = "component name must not be blank")]
    BlankComponent,
    /// The operation name was empty or whitespace.
    #[fail(display = "operation name must not be blank")]
    BlankOperation,
}

/// A task that panicked instead of returning.
#[derive(Debug, Fail)]
#[fail(display = "task panicked: {}", message)]
pub struct TaskPanicked {
    /// The panic message, or `Box<dyn Any>` if the payload was not text.
    pub message: String,
}

impl TaskPanicked {
    /// Wraps the payload returned by `catch_unwind`.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            String::from("Box<dyn Any>")
        };
        Self { message }
    }
}

/// Everything the runner can hand back to its caller.
#[derive(Debug)]
pub enum Error {
    /// The options were rejected before the task ran.
    InvalidConfig(ConfigErrorKind),
    /// The task returned an error or panicked; the original failure is the cause.
    Task(failure::Error),
    /// The environment was not in a state the runner can make sense of.
    Internal {
        /// What went wrong.
        message: String,
    },
}

impl Error {
    /// Shorthand for [`Error::Internal`].
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// The task's own failure, if this error came from the task.
    pub fn task_failure(&self) -> Option<&failure::Error> {
        match self {
            Error::Task(cause) => Some(cause),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidConfig(kind) => write!(f, "invalid run options: {}", kind),
            Error::Task(cause) => write!(f, "task failed: {}", cause),
            Error::Internal { message } => write!(f, "internal error: {}", message),
        }
    }
}

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        match self {
            Error::InvalidConfig(kind) => Some(kind),
            Error::Task(cause) => Some(cause.as_fail()),
            Error::Internal { .. } => None,
        }
    }
}

impl From<ConfigErrorKind> for Error {
    fn from(kind: ConfigErrorKind) -> Self {
        Error::InvalidConfig(kind)
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
