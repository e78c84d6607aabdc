//! In-memory log sink for the `log` facade.
//!
//! Keeps the last [`MAX_LOG_ENTRIES`] records; older ones are overwritten.
//! A console task calls [`drain`] to move them somewhere visible.

use core::fmt::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Mutex;

pub const MAX_LOG_ENTRIES: usize = 64;

/// Longest message kept per record; the rest is cut off.
pub const MAX_MESSAGE_LEN: usize = 120;

/// One buffered record.
#[derive(Clone, Copy)]
pub struct LogRecord {
    pub level: Level,
    target: [u8; 24],
    target_len: usize,
    message: [u8; MAX_MESSAGE_LEN],
    message_len: usize,
}

impl LogRecord {
    const EMPTY: Self = Self {
        level: Level::Trace,
        target: [0; 24],
        target_len: 0,
        message: [0; MAX_MESSAGE_LEN],
        message_len: 0,
    };

    pub fn target(&self) -> &str {
        core::str::from_utf8(&self.target[..self.target_len]).unwrap_or("?")
    }

    pub fn message(&self) -> &str {
        // Truncation may split a code point; keep the valid prefix.
        match core::str::from_utf8(&self.message[..self.message_len]) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(&self.message[..e.valid_up_to()]).unwrap_or(""),
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:<5}] {}: {}", self.level, self.target(), self.message())
    }
}

/// Truncating writer into a record's message buffer.
struct MessageWriter<'a> {
    buf: &'a mut [u8; MAX_MESSAGE_LEN],
    len: &'a mut usize,
}

impl Write for MessageWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = MAX_MESSAGE_LEN - *self.len;
        let take = s.len().min(room);
        self.buf[*self.len..*self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        *self.len += take;
        Ok(())
    }
}

/// Fixed ring of records.
pub struct LogRing {
    records: [LogRecord; MAX_LOG_ENTRIES],
    /// Index of the oldest record.
    start: usize,
    count: usize,
    /// Records overwritten before being drained.
    dropped: usize,
}

impl LogRing {
    pub const fn new() -> Self {
        Self {
            records: [LogRecord::EMPTY; MAX_LOG_ENTRIES],
            start: 0,
            count: 0,
            dropped: 0,
        }
    }

    pub fn push(&mut self, level: Level, target: &str, args: fmt::Arguments<'_>) {
        let slot = if self.count == MAX_LOG_ENTRIES {
            let oldest = self.start;
            self.start = (self.start + 1) % MAX_LOG_ENTRIES;
            self.dropped += 1;
            oldest
        } else {
            self.count += 1;
            (self.start + self.count - 1) % MAX_LOG_ENTRIES
        };

        let record = &mut self.records[slot];
        record.level = level;
        let target = target.as_bytes();
        record.target_len = target.len().min(record.target.len());
        record.target[..record.target_len].copy_from_slice(&target[..record.target_len]);
        record.message_len = 0;
        let _ = MessageWriter {
            buf: &mut record.message,
            len: &mut record.message_len,
        }
        .write_fmt(args);
    }

    /// Hand every buffered record to `f`, oldest first, and empty the ring.
    pub fn drain(&mut self, mut f: impl FnMut(&LogRecord)) {
        for i in 0..self.count {
            f(&self.records[(self.start + i) % MAX_LOG_ENTRIES]);
        }
        self.start = 0;
        self.count = 0;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// GLOBAL SINK
// ═══════════════════════════════════════════════════════════════════════════

/// `log::Log` implementation backed by a [`LogRing`].
pub struct RingLogger {
    ring: Mutex<LogRing>,
}

impl RingLogger {
    pub const fn new() -> Self {
        Self {
            ring: Mutex::new(LogRing::new()),
        }
    }
}

impl Default for RingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            self.ring
                .lock()
                .push(record.level(), record.target(), *record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: RingLogger = RingLogger::new();

/// Install the ring sink as the global logger.
///
/// Only the first call installs it; later calls just adjust the level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

/// Drain the global sink, oldest record first.
pub fn drain(f: impl FnMut(&LogRecord)) {
    LOGGER.ring.lock().drain(f);
}

/// Records currently buffered in the global sink.
pub fn log_count() -> usize {
    LOGGER.ring.lock().len()
}
