use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use asynclog::{Emit, LogLevel, Logger, LoggerConfig, Timestamp};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[derive(Clone, Default)]
struct Console(Arc<Mutex<Vec<u8>>>);

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Console {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn file_logger(dir: &Path, config: LoggerConfig) -> (Logger, Console) {
    let console = Console::default();
    let logger = Logger::start_with_console(config.with_directory(dir), console.clone()).unwrap();
    (logger, console)
}

fn log_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "log"))
        .collect();
    files.sort();
    files
}

fn read_logs(dir: &Path) -> String {
    log_files(dir)
        .iter()
        .map(|path| std::fs::read_to_string(path).unwrap())
        .collect()
}

/// Text after the level, timestamp and thread brackets.
fn body(line: &str) -> &str {
    line.splitn(4, ']').nth(3).unwrap()
}

#[test]
fn threshold_filters_all_but_critical() {
    let dir = tempfile::tempdir().unwrap();
    let (logger, _console) = file_logger(
        dir.path(),
        LoggerConfig::file("levels").with_level(LogLevel::Error),
    );
    let emitted: Vec<(LogLevel, Emit)> = LogLevel::ALL
        .into_iter()
        .filter(|level| *level != LogLevel::Fatal)
        .map(|level| (level, logger.output(level, format_args!("at {level:?}")).unwrap()))
        .collect();
    logger.shutdown();

    for (level, emit) in &emitted {
        let expected = if *level >= LogLevel::Error {
            Emit::Queued
        } else {
            Emit::Filtered
        };
        assert_eq!(*emit, expected, "{level:?}");
    }
    let text = read_logs(dir.path());
    let tags: Vec<&str> = text.lines().map(|line| line.split(']').next().unwrap()).collect();
    assert_eq!(tags, ["[ERROR", "[SYSE", "[CRITICAL"]);

    logger.set_level(LogLevel::Critical);
    assert_eq!(
        logger.output(LogLevel::Error, format_args!("dropped")).unwrap(),
        Emit::Filtered
    );
}

#[test]
fn single_thread_order_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let (logger, console) = file_logger(dir.path(), LoggerConfig::file("fifo"));
    for i in 0..1000 {
        logger.output(LogLevel::Info, format_args!("line {i}")).unwrap();
    }
    logger.shutdown();

    let text = read_logs(dir.path());
    let bodies: Vec<&str> = text.lines().map(body).collect();
    let expected: Vec<String> = (0..1000).map(|i| format!("line {i}")).collect();
    assert_eq!(bodies, expected);
    assert_eq!(console.text(), text);
}

#[test]
fn shutdown_writes_everything_queued() {
    let dir = tempfile::tempdir().unwrap();
    let (logger, console) = file_logger(dir.path(), LoggerConfig::console());
    for i in 0..250 {
        logger.output(LogLevel::Warn, format_args!("pending {i}")).unwrap();
    }
    logger.shutdown();
    assert!(!logger.is_running());
    assert_eq!(console.text().lines().count(), 250);
    assert!(log_files(dir.path()).is_empty());
}

#[test]
fn concurrent_producers_keep_their_own_order() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 200;
    let dir = tempfile::tempdir().unwrap();
    let (logger, _console) = file_logger(dir.path(), LoggerConfig::file("threads"));
    let logger = Arc::new(logger);
    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = Arc::clone(&logger);
            std::thread::spawn(move || {
                for i in 0..PER_THREAD {
                    logger.output(LogLevel::Info, format_args!("{t}:{i}")).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    logger.shutdown();

    let text = read_logs(dir.path());
    let mut next = [0usize; THREADS];
    let mut total = 0;
    for line in text.lines() {
        let (t, i) = body(line).split_once(':').unwrap();
        let (t, i): (usize, usize) = (t.parse().unwrap(), i.parse().unwrap());
        assert_eq!(i, next[t], "thread {t} out of order");
        next[t] += 1;
        total += 1;
    }
    assert_eq!(total, THREADS * PER_THREAD);
}

#[test]
fn rotation_starts_a_new_file() {
    let dir = tempfile::tempdir().unwrap();
    let (logger, _console) = file_logger(dir.path(), LoggerConfig::file("roll").with_roll_size(64));

    let mut first = None;
    for _ in 0..500 {
        first = logger.current_file();
        if first.is_some() {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    let first = first.expect("writer opens a file at start");
    let name = first.file_name().unwrap().to_str().unwrap().to_string();
    let opened_at = name.split('.').nth(1).unwrap().to_string();
    // File names have second resolution, so rotate in a later second.
    while Timestamp::now().to_string() == opened_at {
        std::thread::sleep(Duration::from_millis(50));
    }

    let long = "a".repeat(100);
    logger.output(LogLevel::Info, format_args!("{long}")).unwrap();
    assert!(logger.flush(Duration::from_secs(5)));
    let second = logger.current_file().unwrap();
    assert_ne!(first, second);

    logger.output(LogLevel::Info, format_args!("after rotation")).unwrap();
    logger.shutdown();

    let files = log_files(dir.path());
    assert_eq!(files, [first.clone(), second.clone()]);
    let before = std::fs::read_to_string(&first).unwrap();
    let after = std::fs::read_to_string(&second).unwrap();
    assert!(before.ends_with(&format!("{long}\n")));
    assert!(after.ends_with("after rotation\n"));
    assert_eq!(after.lines().count(), 1);
}

#[test]
fn truncation_bounds_random_messages() {
    let rng = &mut SmallRng::seed_from_u64(0x5EED);
    let messages: Vec<String> = (0..200)
        .map(|_| {
            let len = rng.random_range(0..2000);
            (0..len)
                .map(|_| char::from(rng.random_range(b'a'..=b'z')))
                .collect()
        })
        .collect();

    for truncate in [true, false] {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggerConfig::file("trunc").with_truncate(truncate);
        let (logger, _console) = file_logger(dir.path(), config);
        for message in &messages {
            logger.output(LogLevel::Info, format_args!("{message}")).unwrap();
        }
        logger.shutdown();

        let text = read_logs(dir.path());
        for (line, message) in text.lines().zip(&messages) {
            let body = body(line);
            if truncate {
                assert!(body.chars().count() <= asynclog::format::MAX_MESSAGE_CHARS);
                assert!(message.starts_with(body));
            } else {
                assert_eq!(body, message);
            }
        }
        assert_eq!(text.lines().count(), messages.len());
    }
}

#[test]
fn binary_dump_is_queued_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (logger, _console) = file_logger(dir.path(), LoggerConfig::file("binary"));
    let payload: Vec<u8> = (0u8..40).collect();
    logger.output(LogLevel::Info, format_args!("before")).unwrap();
    assert_eq!(logger.output_binary(&payload).unwrap(), Emit::Queued);
    logger.output(LogLevel::Info, format_args!("after")).unwrap();
    logger.shutdown();

    let text = read_logs(dir.path());
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].ends_with("before"));
    assert!(lines[1].starts_with("address[") && lines[1].ends_with("] size[40]"));
    assert_eq!(
        lines[2],
        "000000 000102030405060708090a0b0c0d0e0f 101112131415161718191a1b1c1d1e1f"
    );
    assert_eq!(lines[3], "000001 2021222324252627");
    assert!(lines[4].ends_with("after"));
}

#[test]
fn binary_dump_ignores_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let (logger, console) = file_logger(
        dir.path(),
        LoggerConfig::console().with_level(LogLevel::Critical),
    );
    logger.output_binary(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
    logger.shutdown();
    assert!(console.text().contains("000000 deadbeef\n"));
}

#[test]
fn macros_capture_the_call_site() {
    let dir = tempfile::tempdir().unwrap();
    let (logger, _console) = file_logger(
        dir.path(),
        LoggerConfig::file("macros").with_level(LogLevel::Trace),
    );
    let value = 42;
    let line = line!() + 1;
    asynclog::warn!(logger, "value is {}", value).unwrap();
    asynclog::trace!(&logger, "inline {value}").unwrap();
    asynclog::syserror!(logger, "plain").unwrap();
    logger.shutdown();

    let text = read_logs(dir.path());
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("[WARN]"));
    assert!(lines[0].ends_with(&format!("[{}:{}]:value is 42", file!(), line)));
    assert!(lines[1].starts_with("[TRACE]"));
    assert!(lines[1].ends_with(&format!("[{}:{}]:inline 42", file!(), line + 1)));
    assert!(lines[2].starts_with("[SYSE]") && lines[2].ends_with("]:plain"));
}

#[test]
fn global_logger_through_macros() {
    let dir = tempfile::tempdir().unwrap();
    let config = LoggerConfig::file("global").with_directory(dir.path());
    let guard = asynclog::init(config).unwrap();
    assert!(matches!(asynclog::info!("hello {}", "world"), Some(Ok(Emit::Queued))));
    assert!(matches!(
        asynclog::debug!("below the default threshold"),
        Some(Ok(Emit::Filtered))
    ));
    asynclog::critical!("always");
    assert!(guard.flush());
    drop(guard);
    assert!(asynclog::global().is_none());
    assert!(asynclog::warn!("no logger installed").is_none());

    let text = read_logs(dir.path());
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("[INFO]") && lines[0].ends_with("]:hello world"));
    assert!(lines[1].starts_with("[CRITICAL]") && lines[1].ends_with("]:always"));
}

#[test]
fn file_named_after_base_and_pid() {
    let dir = tempfile::tempdir().unwrap();
    let (logger, _console) = file_logger(dir.path(), LoggerConfig::file("named"));
    logger.output(LogLevel::Info, format_args!("x")).unwrap();
    logger.shutdown();

    let files = log_files(dir.path());
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_str().unwrap();
    let parts: Vec<&str> = name.split('.').collect();
    assert_eq!(parts.len(), 4, "{name}");
    assert_eq!(parts[0], "named");
    assert_eq!(parts[1].len(), 14);
    assert_eq!(parts[2], asynclog::rolling::pid_string());
    assert_eq!(parts[3], "log");
}
