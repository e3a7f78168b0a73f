//! Command-line front end: runs another program as the task.

use crate::logging;
use crate::options::RunOptions;
use crate::process::System;
use crate::runner;
use crate::task::Task;

use failure::{Fail, ResultExt};
use human_panic::Metadata;
use structopt::clap::Shell;
use structopt::StructOpt;
use strum::VariantNames;
use strum_macros::{EnumString, EnumVariantNames};

use std::path::PathBuf;
use std::process::{Command, ExitStatus};

/// Whether colors should be displayed in the terminal
#[derive(Debug, Eq, PartialEq, EnumString, EnumVariantNames)]
#[strum(serialize_all = "kebab_case")]
enum Color {
    /// Show colors if supported by the terminal
    Auto,
    /// Always try and use colored text
    Always,
    /// Never try to use colored text
    Never,
}

/// run a command with logged start/stop times, then exit with its outcome.
#[derive(StructOpt, Debug)]
#[structopt(name = "execute")]
struct Opt {
    // Flags

    /// Return instead of exiting once the command is done
    #[structopt(long = "no-exit")]
    no_exit: bool,

    /// Ring the terminal bell when the command succeeds (it always rings on failure)
    #[structopt(long)]
    bell: bool,

    /// Write a crash report file if a panic goes uncaught
    #[structopt(long = "crash-report")]
    crash_report: bool,

    /// Only log errors
    #[structopt(short, long)]
    quiet: bool,

    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    // Options

    /// Generates completion for the specified shell
    #[structopt(long, name = "SHELL", possible_values = &Shell::variants())]
    completions: Option<Shell>,

    /// Print colorful output
    #[structopt(long, name = "COLOR", possible_values = Color::VARIANTS, default_value = "auto")]
    color: Color,

    /// Also write every record to <LOG-FILE>
    #[structopt(long = "log-file", name = "LOG-FILE", parse(from_os_str))]
    log_file: Option<PathBuf>,

    /// Level used for start/stop events
    #[structopt(
        long,
        name = "LEVEL",
        possible_values = &["error", "warn", "info", "debug", "trace"],
        default_value = "info"
    )]
    level: log::Level,

    // Arguments

    /// The command to run
    #[structopt(name = "COMMAND")]
    command: Option<String>,

    /// Arguments passed to the command
    #[structopt(name = "ARGS")]
    args: Vec<String>,
}

#[derive(Debug, Fail)]
#[fail(display = "`{}` finished with {}", command, status)]
struct CommandFailed {
    command: String,
    status: ExitStatus,
}

#[derive(Debug, Fail)]
#[fail(display = "no command given")]
struct MissingCommand;

fn metadata() -> Metadata {
    Metadata {
        version: env!("CARGO_PKG_VERSION").into(),
        name: env!("CARGO_PKG_NAME").into(),
        authors: env!("CARGO_PKG_AUTHORS").replace(":", ", ").into(),
        homepage: env!("CARGO_PKG_HOMEPAGE").into(),
    }
}

fn run_command(command: &str, args: &[String]) -> Result<i32, failure::Error> {
    log::debug!("running {} {:?}", command, args);
    let status = Command::new(command)
        .args(args)
        .status()
        .with_context(|_| format!("Unable to run `{}`", command))?;
    if !status.success() {
        return Err(CommandFailed {
            command: command.to_string(),
            status,
        }
        .into());
    }
    Ok(status.code().unwrap_or_default())
}

/// Runs the program
pub fn run() -> Result<(), failure::Error> {
    let opt = Opt::from_args();

    if let Some(shell) = opt.completions {
        Opt::clap().gen_completions_to(env!("CARGO_PKG_NAME"), shell, &mut std::io::stdout());
        return Ok(());
    }

    if opt.color != Color::Auto {
        console::set_colors_enabled_stderr(opt.color == Color::Always);
    }

    logging::setup(
        logging::level_filter(opt.verbose, opt.quiet),
        opt.log_file.as_deref(),
    )?;

    log::debug!("{:#?}", opt);

    let command = opt.command.clone().ok_or(MissingCommand)?;

    let mut options = RunOptions::builder(env!("CARGO_PKG_NAME"), "main")
        .level(opt.level)
        .sound_on_success(opt.bell)
        .exit_when_done(!opt.no_exit);
    if opt.crash_report {
        options = options.crash_report(metadata());
    }
    let options = options.build()?;

    let args = &opt.args;
    runner::run(Task::call(|| run_command(&command, args)), &options, &System)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_and_trailing_args() {
        let opt = Opt::from_iter(&["execute", "-vv", "--no-exit", "--", "ls", "-la", "/tmp"]);
        assert_eq!(opt.verbose, 2);
        assert!(opt.no_exit);
        assert_eq!(opt.level, log::Level::Info);
        assert_eq!(opt.color, Color::Auto);
        assert_eq!(opt.command.as_deref(), Some("ls"));
        assert_eq!(opt.args, vec!["-la".to_string(), "/tmp".to_string()]);
    }

    #[test]
    fn parses_level_and_color() {
        let opt = Opt::from_iter(&["execute", "--level", "debug", "--color", "never", "true"]);
        assert_eq!(opt.level, log::Level::Debug);
        assert_eq!(opt.color, Color::Never);
    }

    #[test]
    fn rejects_unknown_color() {
        assert!(Opt::from_iter_safe(&["execute", "--color", "purple", "true"]).is_err());
    }

    #[test]
    fn missing_program_is_reported() {
        let err = run_command("definitely-not-a-real-program-4242", &[]).unwrap_err();
        assert!(err.to_string().contains("definitely-not-a-real-program-4242"));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_status_is_a_failure() {
        assert_eq!(run_command("true", &[]).unwrap(), 0);
        let err = run_command("false", &[]).unwrap_err();
        assert!(err.downcast_ref::<CommandFailed>().is_some());
    }
}
