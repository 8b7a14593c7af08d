//! Write queue and the writer thread draining it.
//!
//! Producers render records on their own thread and push the finished line
//! onto a shared queue. A single writer thread pops lines in push order,
//! mirrors them to the console and appends them to the rolling log file.
//!
//! # Quick Start
//!
//! ```no_run
//! use asynclog::{Logger, LoggerConfig};
//!
//! let logger = Logger::start(LoggerConfig::file("server")).unwrap();
//! asynclog::info!(logger, "listening on {}", 8080).unwrap();
//! logger.shutdown();
//! ```
//!
//! # Fatal records
//!
//! [`LogLevel::Fatal`] records skip the queue. They are written on the
//! calling thread, opening a log file first if none is open, and the
//! process is then aborted. Because of this a fatal line can appear ahead of
//! non-fatal lines queued before it.
//!
//! # Writer failures
//!
//! If the writer thread cannot open or write a log file it reports the error
//! on stderr and stops. Lines pushed afterwards stay in the queue and are
//! never written; [`Logger::is_running`] turns false.

use std::collections::VecDeque;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::format::{self, thread_token, CallSite, LineFormat};
use crate::hexdump::render_hex_dump;
use crate::mutex::Mutex;
use crate::rolling::{pid_string, RollingFile};
use crate::{LogLevel, LoggerConfig, Timestamp};

/// Name of the directory created under the working directory when no
/// directory is configured.
pub const DEFAULT_LOG_DIR: &str = "Log";

/// Lifecycle of the writer thread.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum WorkerState {
    /// No writer thread exists.
    Stopped,
    /// The writer is waiting for or writing lines.
    Running,
    /// Shutdown was requested; the writer exits once the queue is empty.
    Draining,
}

/// What happened to an emitted record.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Emit {
    /// The line was pushed onto the write queue.
    Queued,
    /// The record was below the level threshold and dropped.
    Filtered,
}

struct Pending {
    lines: VecDeque<String>,
    exiting: bool,
    writing: bool,
    state: WorkerState,
    sink: Option<RollingFile>,
    handle: Option<thread::JoinHandle<()>>,
}

struct Shared {
    pending: Mutex<Pending>,
    /// Signalled when a line is pushed or shutdown is requested.
    wake: Condvar,
    /// Signalled when the writer finds the queue empty or exits.
    idle: Condvar,
    console: Mutex<Box<dyn Write + Send>>,
    level: AtomicU8,
    running: AtomicBool,
    format: LineFormat,
}

impl Shared {
    fn push(&self, line: String) {
        let mut pending = self.pending.lock();
        pending.lines.push_back(line);
        self.wake.notify_one();
    }

    fn echo(&self, line: &str) {
        let mut console = self.console.lock();
        let _ = console.write_all(line.as_bytes());
        if !line.ends_with('\n') {
            let _ = console.write_all(b"\n");
        }
        let _ = console.flush();
    }

    fn write_fatal(&self, line: &str) -> Result<()> {
        self.echo(line);
        let mut pending = self.pending.lock();
        if let Some(sink) = pending.sink.as_mut() {
            sink.open_if_missing()?;
            sink.write(line.as_bytes())?;
        }
        Ok(())
    }

    fn drain(&self) -> Result<()> {
        loop {
            let line = {
                let mut pending = self.pending.lock();
                if let Some(sink) = pending.sink.as_mut() {
                    sink.ensure_open()?;
                }
                loop {
                    if let Some(line) = pending.lines.pop_front() {
                        pending.writing = true;
                        break line;
                    }
                    if pending.writing {
                        pending.writing = false;
                        self.idle.notify_all();
                    }
                    if pending.exiting {
                        return Ok(());
                    }
                    pending = pending.wait(&self.wake);
                }
            };

            self.echo(&line);

            if self.format.newline {
                let mut pending = self.pending.lock();
                if let Some(sink) = pending.sink.as_mut() {
                    sink.write(line.as_bytes())?;
                    sink.record_written(line.len());
                }
            }
        }
    }
}

fn writer_thread(shared: Arc<Shared>) {
    if let Err(err) = shared.drain() {
        eprintln!("asynclog: writer thread stopped: {err}");
    }
    shared.running.store(false, Ordering::Release);
    let mut pending = shared.pending.lock();
    pending.state = WorkerState::Stopped;
    pending.writing = false;
    shared.idle.notify_all();
}

/// Handle to a running asynchronous logger.
///
/// Cloning is not supported; share it behind an [`Arc`] or use the global
/// logger installed by [`init`](crate::init). Dropping the handle shuts the
/// logger down, writing every queued line first.
pub struct Logger {
    shared: Arc<Shared>,
}

impl Logger {
    /// Starts a logger that mirrors every line to stdout.
    ///
    /// # Errors
    ///
    /// Fails if the log directory cannot be created or the writer thread
    /// cannot be spawned.
    pub fn start(config: LoggerConfig) -> Result<Logger> {
        Logger::start_with_console(config, std::io::stdout())
    }

    /// Starts a logger mirroring lines to `console` instead of stdout.
    ///
    /// The log directory is created even when file output is disabled.
    pub fn start_with_console<W>(config: LoggerConfig, console: W) -> Result<Logger>
    where
        W: Write + Send + 'static,
    {
        let directory = match config.directory {
            Some(directory) => directory,
            None => std::env::current_dir()
                .map_err(Error::CurrentDir)?
                .join(DEFAULT_LOG_DIR),
        };
        std::fs::create_dir_all(&directory).map_err(|source| Error::CreateDir {
            path: directory.clone(),
            source,
        })?;

        let to_file = !config.base_name.is_empty();
        let sink = to_file
            .then(|| RollingFile::new(directory, config.base_name, pid_string(), config.roll_size));

        let shared = Arc::new(Shared {
            pending: Mutex::new(Pending {
                lines: VecDeque::new(),
                exiting: false,
                writing: false,
                state: WorkerState::Running,
                sink,
                handle: None,
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
            console: Mutex::new(Box::new(console)),
            level: AtomicU8::new(config.level as u8),
            running: AtomicBool::new(true),
            format: LineFormat {
                truncate: config.truncate,
                newline: to_file,
            },
        });

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("asynclog-writer".into())
            .spawn(move || writer_thread(worker))
            .map_err(Error::Spawn)?;
        shared.pending.lock().handle = Some(handle);
        Ok(Logger { shared })
    }

    /// Current level threshold.
    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.shared.level.load(Ordering::Relaxed)).unwrap_or(LogLevel::Info)
    }

    /// Sets the level threshold. Safe to call from any thread at any time.
    pub fn set_level(&self, level: LogLevel) {
        self.shared.level.store(level as u8, Ordering::Relaxed);
    }

    /// Sets the level threshold from its numeric value, ignoring values
    /// that do not name a level.
    pub fn set_raw_level(&self, raw: u8) {
        if let Some(level) = LogLevel::from_u8(raw) {
            self.set_level(level);
        }
    }

    /// Emits a record without a call-site.
    pub fn output(&self, level: LogLevel, args: fmt::Arguments<'_>) -> Result<Emit> {
        self.emit(level, None, args)
    }

    /// Emits a record tagged with the call-site it came from.
    pub fn output_at(
        &self,
        level: LogLevel,
        callsite: CallSite,
        args: fmt::Arguments<'_>,
    ) -> Result<Emit> {
        self.emit(level, Some(callsite), args)
    }

    fn emit(
        &self,
        level: LogLevel,
        callsite: Option<CallSite>,
        args: fmt::Arguments<'_>,
    ) -> Result<Emit> {
        if !level.passes(self.level()) {
            return Ok(Emit::Filtered);
        }
        let line = format::render(
            level,
            Timestamp::now(),
            thread_token(),
            callsite,
            args,
            self.shared.format,
        );
        if level != LogLevel::Fatal {
            self.shared.push(line);
            return Ok(Emit::Queued);
        }
        self.shared.write_fatal(&line)?;
        std::process::abort()
    }

    /// Queues a hex dump of `bytes`. Dumps are never filtered by level.
    pub fn output_binary(&self, bytes: &[u8]) -> Result<Emit> {
        self.shared.push(render_hex_dump(bytes));
        Ok(Emit::Queued)
    }

    /// Whether the writer thread is still consuming the queue.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Where the writer thread is in its lifecycle.
    pub fn state(&self) -> WorkerState {
        self.shared.pending.lock().state
    }

    /// Path of the log file currently open, if any.
    pub fn current_file(&self) -> Option<PathBuf> {
        let pending = self.shared.pending.lock();
        let sink = pending.sink.as_ref()?;
        sink.current_path().map(PathBuf::from)
    }

    /// Blocks until every queued line has been written or `timeout`
    /// elapses. Returns true if the queue was fully written. A timeout too
    /// large to represent as an instant waits without a deadline.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut pending = self.shared.pending.lock();
        loop {
            let drained = pending.lines.is_empty() && !pending.writing;
            if drained || pending.state == WorkerState::Stopped {
                return drained;
            }
            pending = match deadline {
                None => pending.wait(&self.shared.idle),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    pending.wait_timeout(&self.shared.idle, deadline - now)
                }
            };
        }
    }

    /// Stops the logger: the writer finishes every line queued so far and
    /// exits, then the log file is closed. Lines emitted after this returns
    /// are never written.
    pub fn shutdown(&self) {
        let handle = {
            let mut pending = self.shared.pending.lock();
            pending.exiting = true;
            if pending.state == WorkerState::Running {
                pending.state = WorkerState::Draining;
            }
            pending.handle.take()
        };
        self.shared.wake.notify_one();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        if let Some(sink) = self.shared.pending.lock().sink.as_mut() {
            sink.close();
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

static GLOBAL: RwLock<Option<Arc<Logger>>> = RwLock::new(None);

/// The logger installed by [`init`], if any.
pub fn global() -> Option<Arc<Logger>> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Starts a logger and installs it as the process-wide logger used by the
/// level macros when no handle is given. A previously installed logger is
/// shut down.
///
/// # Examples
///
/// ```no_run
/// fn main() {
///     let _guard = asynclog::init(asynclog::LoggerConfig::file("app")).unwrap();
///
///     asynclog::info!("Application starting");
///     // ... application logic ...
///
///     // Guard dropped here, queued lines are written and the writer stops
/// }
/// ```
#[must_use = "dropping the guard shuts the logger down"]
pub fn init(config: LoggerConfig) -> Result<LoggerGuard> {
    let logger = Arc::new(Logger::start(config)?);
    let previous = GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(logger);
    if let Some(previous) = previous {
        previous.shutdown();
    }
    Ok(LoggerGuard {})
}

/// Guard that keeps the global logger installed.
///
/// When this guard is dropped the global logger is uninstalled, every queued
/// line is written and the writer thread is joined.
pub struct LoggerGuard {}

impl LoggerGuard {
    /// Blocks until all queued lines have been written, with a timeout of
    /// 2 seconds.
    pub fn flush(&self) -> bool {
        match global() {
            Some(logger) => logger.flush(Duration::from_secs(2)),
            None => true,
        }
    }
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let logger = GLOBAL.write().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(logger) = logger {
            logger.shutdown();
        }
    }
}

/// Emits through the global logger. `None` when no logger is installed.
#[doc(hidden)]
pub fn global_output(
    level: LogLevel,
    callsite: CallSite,
    args: fmt::Arguments<'_>,
) -> Option<Result<Emit>> {
    let logger = global()?;
    Some(logger.output_at(level, callsite, args))
}
