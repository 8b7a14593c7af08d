//! Asynchronous leveled logging.
//!
//! Application threads render records and hand the finished lines to a
//! single writer thread, which appends them to a size-rotated log file and
//! mirrors them to the console. See [`collector`] for the pipeline and
//! [`LoggerConfig`] for the available settings.

extern crate self as asynclog;

use std::path::PathBuf;
use std::str::FromStr;

mod error;
pub mod format;
pub mod hexdump;
mod mutex;
pub mod rolling;
mod timestamp;

pub mod collector;

pub use collector::{global, init, Emit, Logger, LoggerGuard, WorkerState};
pub use error::{Error, Result};
pub use format::CallSite;
pub use timestamp::Timestamp;

pub use asynclog_macros::{critical, debug, error, fatal, info, syserror, trace, warn};

#[doc(hidden)]
pub mod __private {
    pub use crate::collector::global_output;
}

/// Severity of a record, ordered from least to most severe.
///
/// Records below the configured threshold are dropped, except
/// [`LogLevel::Critical`] which is always written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// Failure in the surrounding framework or operating system rather than
    /// in application logic.
    SysError,
    /// Written synchronously, then the process is aborted.
    Fatal,
    Critical,
}

impl LogLevel {
    pub const ALL: [LogLevel; 8] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::SysError,
        LogLevel::Fatal,
        LogLevel::Critical,
    ];

    pub fn from_u8(byte: u8) -> Option<LogLevel> {
        LogLevel::ALL.get(byte as usize).copied()
    }

    /// Bracketed tag starting every rendered line.
    pub fn tag(self) -> &'static str {
        match self {
            LogLevel::Trace => "[TRACE]",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Info => "[INFO]",
            LogLevel::Warn => "[WARN]",
            LogLevel::Error => "[ERROR]",
            LogLevel::SysError => "[SYSE]",
            LogLevel::Fatal => "[FATAL]",
            LogLevel::Critical => "[CRITICAL]",
        }
    }

    /// Whether a record at this level is written under `threshold`.
    pub fn passes(self, threshold: LogLevel) -> bool {
        self == LogLevel::Critical || self >= threshold
    }
}

impl FromStr for LogLevel {
    type Err = &'static str;

    fn from_str(input: &str) -> core::result::Result<Self, Self::Err> {
        let level = match input.to_ascii_uppercase().as_str() {
            "TRACE" => LogLevel::Trace,
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARN" => LogLevel::Warn,
            "ERROR" => LogLevel::Error,
            "SYSE" | "SYSERROR" => LogLevel::SysError,
            "FATAL" => LogLevel::Fatal,
            "CRITICAL" => LogLevel::Critical,
            _ => return Err("Invalid log level"),
        };
        Ok(level)
    }
}

/// Settings for a [`Logger`].
///
/// An empty `base_name` selects console-only output: no file is ever opened
/// and lines carry no trailing newline.
///
/// # String Format
///
/// `LoggerConfig` implements `FromStr` so it can be read from the
/// `ASYNCLOG_CONFIG` environment variable, see [`init_from_env`]:
///
/// `[BASE_NAME@]KIND[:PATH][;OPTION]*`
///
/// - `KIND`: (Required) one of
///   - `Console`: console output only. `PATH` must be empty.
///   - `File`: rolling files named after `BASE_NAME`, which is required.
///     `PATH` optionally sets the directory, otherwise `Log` under the
///     working directory is used.
/// - `OPTION`: any of `truncate`, `roll=<BYTES>`, `level=<LEVEL>`.
///
/// # Examples of String Parsing
///
/// - `"Console"` parses to `LoggerConfig::console()`
/// - `"server@File"` parses to `LoggerConfig::file("server")`
/// - `"server@File:/var/log/server;roll=1048576;level=debug"`
/// - `"Console;truncate;level=WARN"`
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct LoggerConfig {
    pub base_name: String,
    pub directory: Option<PathBuf>,
    /// Clip message bodies to [`format::MAX_MESSAGE_CHARS`] characters.
    pub truncate: bool,
    /// Bytes written to a file before the next one is opened.
    pub roll_size: u64,
    pub level: LogLevel,
}

impl std::default::Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            base_name: String::new(),
            directory: None,
            truncate: false,
            roll_size: rolling::DEFAULT_ROLL_SIZE,
            level: LogLevel::Info,
        }
    }
}

impl LoggerConfig {
    pub fn console() -> Self {
        LoggerConfig::default()
    }

    pub fn file(base_name: &str) -> Self {
        LoggerConfig::default().with_base_name(base_name)
    }

    pub fn with_base_name(self, name: &str) -> Self {
        LoggerConfig {
            base_name: name.to_string(),
            ..self
        }
    }

    pub fn with_directory(self, directory: impl Into<PathBuf>) -> Self {
        LoggerConfig {
            directory: Some(directory.into()),
            ..self
        }
    }

    pub fn with_truncate(self, truncate: bool) -> Self {
        LoggerConfig { truncate, ..self }
    }

    pub fn with_roll_size(self, roll_size: u64) -> Self {
        LoggerConfig { roll_size, ..self }
    }

    pub fn with_level(self, level: LogLevel) -> Self {
        LoggerConfig { level, ..self }
    }

    pub fn writes_file(&self) -> bool {
        !self.base_name.is_empty()
    }
}

impl FromStr for LoggerConfig {
    type Err = &'static str;

    fn from_str(input: &str) -> core::result::Result<Self, Self::Err> {
        let mut parts = input.split(';');
        let mut head = parts.next().unwrap_or_default();
        let base_name = if let Some((base_name, rest)) = head.split_once('@') {
            head = rest;
            base_name
        } else {
            ""
        };
        let (kind, path) = head.split_once(':').unwrap_or((head, ""));
        let mut config = match kind {
            "Console" => {
                if !path.is_empty() {
                    return Err("Console output does not take a path");
                }
                LoggerConfig::console()
            }
            "File" => {
                if base_name.is_empty() {
                    return Err("File output requires a base name");
                }
                let config = LoggerConfig::file(base_name);
                if path.is_empty() {
                    config
                } else {
                    config.with_directory(path)
                }
            }
            _ => return Err("Invalid output kind"),
        };
        for option in parts {
            let (key, value) = option.split_once('=').unwrap_or((option, ""));
            match key {
                "truncate" => config.truncate = true,
                "roll" => {
                    config.roll_size = value.parse().map_err(|_| "Invalid roll size")?;
                }
                "level" => config.level = value.parse()?,
                _ => return Err("Unknown option"),
            }
        }
        Ok(config)
    }
}

/// Starts the global logger with configuration from the env var:
///     `ASYNCLOG_CONFIG`
/// Using [LoggerConfig::default()] (console only) if the env var can't be
/// read. When `base_name` is given it replaces the configured one, which
/// turns file output on. If quiet is not set to true, the selected
/// configuration will be printed to stdout.
///
/// # Example:
/// ```no_run
/// let _guard = asynclog::init_from_env(Some("service"), false).unwrap();
/// asynclog::info!("Hello World");
/// ```
pub fn init_from_env(base_name: Option<&str>, quiet: bool) -> Result<LoggerGuard> {
    let (mut config, printstmt) = if let Ok(value) = std::env::var("ASYNCLOG_CONFIG") {
        match value.parse::<LoggerConfig>() {
            Ok(value) => (
                value,
                "configuration from the ASYNCLOG_CONFIG environment variable",
            ),
            Err(err) => {
                if !quiet {
                    println!(
                        "ASYNCLOG: Error parsing ASYNCLOG_CONFIG environment variable\n value: `{}`\n error: {}",
                        value, err
                    );
                }
                (
                    LoggerConfig::default(),
                    "default configuration after an error parsing",
                )
            }
        }
    } else {
        (
            LoggerConfig::default(),
            "default configuration (ASYNCLOG_CONFIG not set)",
        )
    };
    if let Some(base_name) = base_name {
        config = config.with_base_name(base_name);
    }

    if !quiet {
        println!("ASYNCLOG: Using the {printstmt}: {:#?}", config)
    }
    init(config)
}
