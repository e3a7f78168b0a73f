//! The unit of work a run wraps.

use std::fmt;

/// A unit of work handed to the runner.
///
/// A task either produces a value (`Call`) or only performs an action (`Action`).
/// Both shapes may fail by returning an error or by panicking.
pub enum Task<'a, T> {
    /// Produces a value on success.
    Call(Box<dyn FnOnce() -> Result<T, failure::Error> + 'a>),
    /// Produces nothing on success.
    Action(Box<dyn FnOnce() -> Result<(), failure::Error> + 'a>),
}

impl<'a, T> Task<'a, T> {
    /// Wraps a value-producing closure.
    pub fn call<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<T, failure::Error> + 'a,
    {
        Task::Call(Box::new(f))
    }

    /// Wraps a closure run only for its effects.
    pub fn action<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), failure::Error> + 'a,
    {
        Task::Action(Box::new(f))
    }

    /// Runs the task once. `Action` tasks yield `None`.
    pub(crate) fn execute(self) -> Result<Option<T>, failure::Error> {
        match self {
            Task::Call(f) => f().map(Some),
            Task::Action(f) => f().map(|()| None),
        }
    }

    /// `true` for [`Task::Call`].
    pub fn produces_value(&self) -> bool {
        match self {
            Task::Call(_) => true,
            Task::Action(_) => false,
        }
    }
}

impl<'a, T> fmt::Debug for Task<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Task::Call(_) => f.write_str("Task::Call(..)"),
            Task::Action(_) => f.write_str("Task::Action(..)"),
        }
    }
}
