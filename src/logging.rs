//! The sink run records go to, and the `fern` setup for the binary.

use failure::ResultExt;
use log::{Level, LevelFilter, Log, Metadata, Record};

use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Where the runner and the failure logger send their records.
///
/// `Global` forwards to whatever logger is installed behind the `log` facade;
/// `Custom` sends to a specific sink. The runner never closes either.
#[derive(Clone)]
pub enum Destination {
    /// The logger installed behind the `log` facade.
    Global,
    /// A specific logger.
    Custom(Arc<dyn Log>),
}

impl Default for Destination {
    fn default() -> Self {
        Destination::Global
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Destination::Global => f.write_str("Destination::Global"),
            Destination::Custom(_) => f.write_str("Destination::Custom(..)"),
        }
    }
}

impl Destination {
    /// Wraps `logger` in an [`Arc`].
    pub fn custom<L: Log + 'static>(logger: L) -> Self {
        Destination::Custom(Arc::new(logger))
    }

    fn sink(&self) -> &dyn Log {
        match self {
            Destination::Global => log::logger(),
            Destination::Custom(logger) => logger.as_ref(),
        }
    }

    /// Writes one record tagged with the component as its target and the
    /// operation as a message prefix.
    pub fn emit(&self, level: Level, component: &str, operation: &str, message: fmt::Arguments) {
        self.log(
            &Record::builder()
                .level(level)
                .target(component)
                .module_path(Some(component))
                .args(format_args!("{}: {}", operation, message))
                .build(),
        );
    }
}

impl Log for Destination {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.sink().enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.sink().log(record)
    }

    fn flush(&self) {
        self.sink().flush()
    }
}

/// Maps `-v` occurrences to a stderr filter; `quiet` wins over any verbosity.
pub fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Installs the global logger: coloured records on stderr, plus every record
/// at trace level in `log_file` when one is given.
pub fn setup(stderr_level: LevelFilter, log_file: Option<&Path>) -> Result<(), failure::Error> {
    let stderr_config = fern::Dispatch::new()
        .format(|out, message, record| {
            let subtle = console::Style::new().dim();
            let level_style = match record.level() {
                Level::Error => console::Style::new().red().reverse(),
                Level::Warn => console::Style::new().yellow(),
                Level::Info => console::Style::new().blue(),
                Level::Debug => console::Style::new().magenta(),
                Level::Trace => console::Style::new().cyan(),
            };
            let level_part = level_style.apply_to(format!("[{}]", record.level()));
            let target_part = subtle.apply_to(format!("\t{}\t> ", record.target()));
            out.finish(format_args!("{}{}{}", level_part, target_part, message))
        })
        .level(stderr_level)
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new().chain(stderr_config);

    if let Some(path) = log_file {
        let file_config = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{}[{}][{}] {}",
                    chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                    record.target(),
                    record.level(),
                    message
                ))
            })
            .chain(
                fern::log_file(path)
                    .with_context(|_| format!("Unable to open log file {}", path.display()))?,
            )
            .level(LevelFilter::Trace);
        dispatch = dispatch.chain(file_config);
    }

    dispatch
        .apply()
        .with_context(|_| "Unable to instantiate logger")?;

    Ok(())
}
