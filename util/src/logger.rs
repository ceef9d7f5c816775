//! Logging for the rover executables.
//!
//! Records go to the terminal and to the session's log file. The terminal never shows anything
//! more verbose than `INFO`, so that per-frame debug output of the control loop only ends up in
//! the file.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use log::{self, info, Record};
use fern::{self, FormatCallback};
use colored::{ColoredString, Colorize};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Most verbose level shown on the terminal.
const TERMINAL_MAX_LEVEL: LevelFilter = LevelFilter::Info;

/// Noisy dependencies and the most verbose level logged for them.
const QUIET_TARGETS: [(&str, LevelFilter); 2] = [
    ("zmq", LevelFilter::Info),
    ("image", LevelFilter::Warn),
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of `INFO` or more verbose, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this session.
///
/// `file_level` is the most verbose level written to the session log file, and must be `INFO`
/// or more verbose. The terminal is capped at `INFO`.
///
/// Must only be called once per process.
pub fn logger_init(
    file_level: LevelFilter,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if file_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(file_level))
    }

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    let terminal = fern::Dispatch::new()
        .format(|out, message, record| {
            format_record(out, message, record, level_to_str(record.level()))
        })
        .level(file_level.min(TERMINAL_MAX_LEVEL))
        .chain(std::io::stdout());

    // No colour codes in the file
    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            format_record(out, message, record, level_to_str(record.level()).clear())
        })
        .level(file_level)
        .chain(log_file);

    QUIET_TARGETS.iter()
        .fold(fern::Dispatch::new(), |d, (target, level)| d.level_for(*target, *level))
        .chain(terminal)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log file level: {:?}", file_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Prefix a message with the session time and level, plus the target below `INFO`.
fn format_record(
    out: FormatCallback,
    message: &std::fmt::Arguments,
    record: &Record,
    level: ColoredString
) {
    if record.level() > log::Level::Info {
        out.finish(format_args!(
            "[{:10.6} {}] {}: {}",
            session::get_elapsed_seconds(),
            level,
            record.target(),
            message
        ))
    }
    else {
        out.finish(format_args!(
            "[{:10.6} {}] {}",
            session::get_elapsed_seconds(),
            level,
            message
        ))
    }
}

/// Short tag for a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info  => "INF".normal(),
        log::Level::Warn  => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold()
    }
}
