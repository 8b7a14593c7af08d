//! Rendering of log records into single lines.
//!
//! A rendered line looks like
//!
//! ```text
//! [WARN][20250417095652][3][src/net.rs:42]:connection reset by peer
//! ```
//!
//! The level tag, local timestamp and thread token are always present, the
//! bracketed call-site only when one was captured.

use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{LogLevel, Timestamp};

/// Longest message body kept when truncation is enabled, in characters.
pub const MAX_MESSAGE_CHARS: usize = 256;

/// Source location a record was emitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
}

impl CallSite {
    pub const fn new(file: &'static str, line: u32) -> CallSite {
        CallSite { file, line }
    }
}

static NEXT_THREAD_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TOKEN: u64 = NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed);
}

/// Small integer identifying the calling thread, stable for the thread's
/// lifetime and never reused within the process.
pub fn thread_token() -> u64 {
    THREAD_TOKEN.with(|token| *token)
}

/// Per-logger line options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineFormat {
    /// Clip message bodies to [`MAX_MESSAGE_CHARS`].
    pub truncate: bool,
    /// Terminate lines with `\n`. Only set when file output is enabled.
    pub newline: bool,
}

struct Measure(usize);

impl fmt::Write for Measure {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

/// Exact byte length `args` formats to.
pub fn formatted_len(args: fmt::Arguments<'_>) -> usize {
    if let Some(text) = args.as_str() {
        return text.len();
    }
    let mut measure = Measure(0);
    let _ = measure.write_fmt(args);
    measure.0
}

/// Renders one record. The message is measured first so the line is
/// allocated once at its final size.
pub fn render(
    level: LogLevel,
    timestamp: Timestamp,
    thread: u64,
    callsite: Option<CallSite>,
    args: fmt::Arguments<'_>,
    format: LineFormat,
) -> String {
    let message_len = formatted_len(args);
    let mut numbers = itoa::Buffer::new();
    let thread_text = numbers.format(thread);

    let mut prefix_len =
        level.tag().len() + crate::timestamp::COMPACT_LEN + 2 + thread_text.len() + 2;
    if let Some(site) = callsite {
        prefix_len += site.file.len() + 10 + 4;
    }
    let mut line = String::with_capacity(prefix_len + message_len + format.newline as usize);

    line.push_str(level.tag());
    line.push('[');
    timestamp.write_compact(&mut line);
    line.push_str("][");
    line.push_str(thread_text);
    line.push(']');
    if let Some(site) = callsite {
        line.push('[');
        line.push_str(site.file);
        line.push(':');
        line.push_str(numbers.format(site.line));
        line.push_str("]:");
    }

    let body = line.len();
    let _ = line.write_fmt(args);
    if format.truncate {
        clip_chars(&mut line, body, MAX_MESSAGE_CHARS);
    }
    if format.newline {
        line.push('\n');
    }
    line
}

fn clip_chars(line: &mut String, from: usize, max_chars: usize) {
    if let Some((offset, _)) = line[from..].char_indices().nth(max_chars) {
        line.truncate(from + offset);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use jiff::civil::date;

    fn ts() -> Timestamp {
        Timestamp::from_civil(date(2023, 5, 4).at(14, 30, 45, 0))
    }

    #[test]
    fn prefix_layout() {
        let line = render(
            LogLevel::Warn,
            ts(),
            7,
            None,
            format_args!("disk at {}%", 91),
            LineFormat::default(),
        );
        assert_eq!(line, "[WARN][20230504143045][7]disk at 91%");
    }

    #[test]
    fn callsite_precedes_message() {
        let line = render(
            LogLevel::SysError,
            ts(),
            12,
            Some(CallSite::new("src/main.rs", 88)),
            format_args!("bind failed"),
            LineFormat {
                truncate: false,
                newline: true,
            },
        );
        assert_eq!(line, "[SYSE][20230504143045][12][src/main.rs:88]:bind failed\n");
    }

    #[test]
    fn every_level_tag() {
        let tags: Vec<&str> = LogLevel::ALL.iter().map(|level| level.tag()).collect();
        assert_eq!(
            tags,
            [
                "[TRACE]",
                "[DEBUG]",
                "[INFO]",
                "[WARN]",
                "[ERROR]",
                "[SYSE]",
                "[FATAL]",
                "[CRITICAL]"
            ]
        );
    }

    #[test]
    fn truncation_clips_body_only() {
        let long = "x".repeat(1000);
        let format = LineFormat {
            truncate: true,
            newline: true,
        };
        let line = render(
            LogLevel::Info,
            ts(),
            1,
            Some(CallSite::new("a.rs", 1)),
            format_args!("{long}"),
            format,
        );
        let body = line
            .strip_prefix("[INFO][20230504143045][1][a.rs:1]:")
            .expect("prefix intact");
        assert_eq!(body.len(), MAX_MESSAGE_CHARS + 1);
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "é".repeat(300);
        let line = render(
            LogLevel::Info,
            ts(),
            1,
            None,
            format_args!("{long}"),
            LineFormat {
                truncate: true,
                newline: false,
            },
        );
        let body = line.strip_prefix("[INFO][20230504143045][1]").unwrap();
        assert_eq!(body.chars().count(), MAX_MESSAGE_CHARS);
    }

    #[test]
    fn untruncated_long_message_passes_through() {
        let long = "y".repeat(5000);
        let line = render(
            LogLevel::Info,
            ts(),
            1,
            None,
            format_args!("{long}"),
            LineFormat::default(),
        );
        assert!(line.ends_with(&long));
    }

    #[test]
    fn measured_length_matches() {
        let value = 42;
        assert_eq!(formatted_len(format_args!("value is {value:>8}")), 17);
        assert_eq!(formatted_len(format_args!("static")), 6);
    }

    #[test]
    fn allocation_is_exact() {
        let line = render(
            LogLevel::Critical,
            ts(),
            123,
            Some(CallSite::new("lib.rs", 4_000_000_000)),
            format_args!("{}-{}", "a", 1),
            LineFormat {
                truncate: false,
                newline: true,
            },
        );
        assert!(line.capacity() >= line.len());
        assert!(line.capacity() - line.len() <= 10);
    }

    #[test]
    fn thread_tokens_differ() {
        let here = thread_token();
        assert_eq!(here, thread_token());
        let there = std::thread::spawn(thread_token).join().unwrap();
        assert_ne!(here, there);
    }
}
