//! Process-wide side effects, behind a trait.

use crate::error::{Error, Result};
use crate::failure_logger::FailureLogger;

/// The process-wide facilities the runner touches.
///
/// Passed to the runner explicitly so tests can observe hook installs and
/// exit requests without the process going away.
pub trait Process: Sync {
    /// Replaces the process-wide panic hook. The last install wins and it
    /// outlives the call that made it.
    fn install_failure_hook(&self, hook: FailureLogger);

    /// Terminates the process. Only returns if termination did not happen.
    fn exit(&self, code: i32) -> Result<()>;

    /// Signals completion to whoever is watching the terminal.
    fn play_sound(&self, succeeded: bool) -> Result<()>;
}

/// The real process.
#[derive(Debug, Default, Clone, Copy)]
pub struct System;

impl Process for System {
    fn install_failure_hook(&self, hook: FailureLogger) {
        std::panic::set_hook(Box::new(move |info| hook.on_panic(info)));
    }

    fn exit(&self, code: i32) -> Result<()> {
        std::process::exit(code)
    }

    fn play_sound(&self, succeeded: bool) -> Result<()> {
        let bells = if succeeded { "\u{7}" } else { "\u{7}\u{7}" };
        console::Term::stderr()
            .write_str(bells)
            .map_err(|err| Error::internal(format!("unable to ring terminal bell: {}", err)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records what the runner asked of the process instead of doing it.
    #[derive(Default)]
    pub struct RecordingProcess {
        pub hooks: Mutex<Vec<FailureLogger>>,
        pub exits: Mutex<Vec<i32>>,
        pub sounds: Mutex<Vec<bool>>,
        pub fail_exit: bool,
        pub fail_sound: bool,
    }

    impl RecordingProcess {
        pub fn exits(&self) -> Vec<i32> {
            self.exits.lock().unwrap().clone()
        }

        pub fn sounds(&self) -> Vec<bool> {
            self.sounds.lock().unwrap().clone()
        }

        pub fn hook_count(&self) -> usize {
            self.hooks.lock().unwrap().len()
        }
    }

    impl Process for RecordingProcess {
        fn install_failure_hook(&self, hook: FailureLogger) {
            self.hooks.lock().unwrap().push(hook);
        }

        fn exit(&self, code: i32) -> Result<()> {
            self.exits.lock().unwrap().push(code);
            if self.fail_exit {
                return Err(Error::internal("exit refused"));
            }
            Ok(())
        }

        fn play_sound(&self, succeeded: bool) -> Result<()> {
            self.sounds.lock().unwrap().push(succeeded);
            if self.fail_sound {
                return Err(Error::internal("no speaker"));
            }
            Ok(())
        }
    }
}
