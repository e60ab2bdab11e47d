//!
//! `log` backend that forwards records to the host as LogRecord events.
//!
//! Records may be produced from any context, so encoded frames are queued in a
//! bounded outbox and written to the link by the main loop via
//! [`EventLogger::drain`].  A frame that does not fit in the outbox is dropped
//! whole.
//!

use core::cell::RefCell;
use core::sync::atomic::{AtomicU8, Ordering};

use critical_section::Mutex;
use heapless::Vec;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::events::{
    encode_event, EncodedLogRecord, LogRecord, MAX_EVENT_FRAME_LEN, MAX_LOG_RECORD_LEN,
};
use crate::io::{ByteSink, FrameQueue};

/// Target used by [`critical!`](crate::critical) to mark error records as critical.
pub const CRITICAL_TARGET: &str = "critical";

/// Log an error at critical severity.
#[macro_export]
macro_rules! critical {
    ($($arg:tt)+) => {
        $crate::__log::error!(target: $crate::logging::CRITICAL_TARGET, $($arg)+)
    };
}

/// Severity scale understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
    Trace = 5,
    Debug = 10,
    Info = 20,
    Warn = 30,
    Error = 40,
    Critical = 50,
}

impl Severity {
    pub fn of(metadata: &Metadata) -> Self {
        match metadata.level() {
            Level::Error if metadata.target() == CRITICAL_TARGET => Self::Critical,
            Level::Error => Self::Error,
            Level::Warn => Self::Warn,
            Level::Info => Self::Info,
            Level::Debug => Self::Debug,
            Level::Trace => Self::Trace,
        }
    }

    /// Narrowest `log` filter passing every record at or above `min`.
    pub fn level_filter(min: u8) -> LevelFilter {
        match min {
            0..=5 => LevelFilter::Trace,
            6..=10 => LevelFilter::Debug,
            11..=20 => LevelFilter::Info,
            21..=30 => LevelFilter::Warn,
            31..=50 => LevelFilter::Error,
            _ => LevelFilter::Off,
        }
    }
}

/// Strip directories from a source path.
fn file_tag(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path)
}

struct Outbox<const N: usize> {
    frames: FrameQueue<N>,
    /// Body of the latest record at error severity or worse.
    last_error: Option<Vec<u8, MAX_LOG_RECORD_LEN>>,
}

/// Logger queueing up to `N` bytes of framed records.
pub struct EventLogger<const N: usize> {
    min_severity: AtomicU8,
    outbox: Mutex<RefCell<Outbox<N>>>,
}

impl<const N: usize> EventLogger<N> {
    pub const fn new() -> Self {
        Self {
            min_severity: AtomicU8::new(Severity::Info as u8),
            outbox: Mutex::new(RefCell::new(Outbox {
                frames: FrameQueue::new(),
                last_error: None,
            })),
        }
    }

    /// Install as the global logger.
    pub fn init(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(Severity::level_filter(self.min_severity()));
        Ok(())
    }

    pub fn min_severity(&self) -> u8 {
        self.min_severity.load(Ordering::Relaxed)
    }

    pub fn set_min_severity(&self, severity: u8) {
        self.min_severity.store(severity, Ordering::Relaxed);
        log::set_max_level(Severity::level_filter(severity));
    }

    /// Queue the cached error record again.  Returns `false` if no error has
    /// been logged yet.
    pub fn replay_last_error(&self) -> bool {
        critical_section::with(|cs| {
            let mut outbox = self.outbox.borrow_ref_mut(cs);
            let Some(body) = outbox.last_error.clone() else {
                return false;
            };

            let mut frame = [0u8; MAX_EVENT_FRAME_LEN];
            match encode_event(&EncodedLogRecord(&body), &mut frame) {
                Ok(len) => outbox.frames.push_frame(&frame[..len]),
                Err(_) => false,
            }
        })
    }

    /// Whether any queued bytes are waiting for [`drain`](Self::drain).
    pub fn has_pending(&self) -> bool {
        critical_section::with(|cs| !self.outbox.borrow_ref(cs).frames.is_empty())
    }

    /// Hand every queued frame to `sink`, one whole frame per write.
    pub fn drain<S: ByteSink + ?Sized>(&self, sink: &mut S) {
        let mut frame = [0u8; MAX_EVENT_FRAME_LEN];
        while let Some(len) =
            critical_section::with(|cs| self.outbox.borrow_ref_mut(cs).frames.pop_frame(&mut frame))
        {
            sink.write_all(&frame[..len]);
        }
    }
}

impl<const N: usize> Default for EventLogger<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Log for EventLogger<N> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        Severity::of(metadata) as u8 >= self.min_severity()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let severity = Severity::of(record.metadata());
        let mut body = [0u8; MAX_LOG_RECORD_LEN];
        let len = LogRecord {
            file: record.file().map(file_tag).unwrap_or("?"),
            severity: severity as u8,
            line: record.line().unwrap_or(0),
            text: *record.args(),
        }
        .encode_body(&mut body);

        let mut frame = [0u8; MAX_EVENT_FRAME_LEN];
        let Ok(frame_len) = encode_event(&EncodedLogRecord(&body[..len]), &mut frame) else {
            return;
        };

        critical_section::with(|cs| {
            let mut outbox = self.outbox.borrow_ref_mut(cs);
            outbox.frames.push_frame(&frame[..frame_len]);
            if severity >= Severity::Error {
                outbox.last_error = Vec::from_slice(&body[..len]).ok();
            }
        });
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::cobs;
    use crate::events::MAX_EVENT_LEN;

    #[derive(Default)]
    struct Wire(Vec<u8>);

    impl ByteSink for Wire {
        fn write_all(&mut self, bytes: &[u8]) {
            self.0.extend_from_slice(bytes);
        }
    }

    /// Split drained bytes into unstuffed messages.
    fn messages(wire: &[u8]) -> Vec<Vec<u8>> {
        wire.split(|&b| b == 0)
            .filter(|stuffed| !stuffed.is_empty())
            .map(|stuffed| {
                let mut message = [0u8; MAX_EVENT_LEN];
                let len = cobs::decode(stuffed, &mut message).unwrap();
                message[..len].to_vec()
            })
            .collect()
    }

    fn drained<const N: usize>(logger: &EventLogger<N>) -> Vec<Vec<u8>> {
        let mut wire = Wire::default();
        logger.drain(&mut wire);
        messages(&wire.0)
    }

    #[test]
    fn test_record_is_framed() {
        let logger = EventLogger::<512>::new();
        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .file(Some("control/src/node.rs"))
                .line(Some(0x0102))
                .args(format_args!("late by {}us", 40))
                .build(),
        );
        assert!(logger.has_pending());

        let messages = drained(&logger);
        assert!(!logger.has_pending());
        assert_eq!(messages.len(), 1);
        let mut expected = std::vec![3u8];
        expected.extend_from_slice(b"node.rs\0");
        expected.push(Severity::Warn as u8);
        expected.extend_from_slice(&[0, 0, 1, 2]);
        expected.extend_from_slice(b"late by 40us");
        assert_eq!(messages[0], expected);
    }

    #[test]
    fn test_records_below_minimum_are_dropped() {
        let logger = EventLogger::<512>::new();
        logger.log(&Record::builder().level(Level::Debug).args(format_args!("hidden")).build());
        assert!(!logger.has_pending());

        logger.set_min_severity(Severity::Debug as u8);
        logger.log(&Record::builder().level(Level::Debug).args(format_args!("shown")).build());
        let messages = drained(&logger);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].ends_with(b"shown"));
        assert_eq!(messages[0][1..3], *b"?\0");
    }

    #[test]
    fn test_critical_target() {
        let metadata = Metadata::builder()
            .level(Level::Error)
            .target(CRITICAL_TARGET)
            .build();
        assert_eq!(Severity::of(&metadata), Severity::Critical);

        let metadata = Metadata::builder().level(Level::Error).target("node").build();
        assert_eq!(Severity::of(&metadata), Severity::Error);
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(Severity::level_filter(0), LevelFilter::Trace);
        assert_eq!(Severity::level_filter(10), LevelFilter::Debug);
        assert_eq!(Severity::level_filter(20), LevelFilter::Info);
        assert_eq!(Severity::level_filter(25), LevelFilter::Warn);
        assert_eq!(Severity::level_filter(45), LevelFilter::Error);
        assert_eq!(Severity::level_filter(51), LevelFilter::Off);
    }

    #[test]
    fn test_replay_last_error() {
        let logger = EventLogger::<512>::new();
        assert!(!logger.replay_last_error());

        logger.log(
            &Record::builder()
                .level(Level::Error)
                .file(Some("imu.rs"))
                .line(Some(7))
                .args(format_args!("no data ready"))
                .build(),
        );
        logger.log(&Record::builder().level(Level::Info).args(format_args!("fine")).build());
        let first = drained(&logger);
        assert_eq!(first.len(), 2);

        assert!(logger.replay_last_error());
        let replayed = drained(&logger);
        assert_eq!(replayed, std::vec![first[0].clone()]);
    }

    #[test]
    fn test_full_outbox_drops_whole_frames() {
        let logger = EventLogger::<24>::new();
        logger.log(&Record::builder().level(Level::Error).args(format_args!("abc")).build());
        logger.log(&Record::builder().level(Level::Error).args(format_args!("this one is too long")).build());

        let messages = drained(&logger);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].ends_with(b"abc"));
    }

    #[test]
    fn test_file_tag() {
        assert_eq!(file_tag("src/main.rs"), "main.rs");
        assert_eq!(file_tag("C:\\fw\\src\\main.rs"), "main.rs");
        assert_eq!(file_tag("lib.rs"), "lib.rs");
    }

    #[test]
    fn test_drain_writes_one_frame_per_call() {
        struct Writes(Vec<Vec<u8>>);

        impl ByteSink for Writes {
            fn write_all(&mut self, bytes: &[u8]) {
                self.0.push(bytes.to_vec());
            }
        }

        let logger = EventLogger::<1024>::new();
        for i in 0..12 {
            logger.log(&Record::builder().level(Level::Error).args(format_args!("record number {}", i)).build());
        }

        let mut writes = Writes(Vec::new());
        logger.drain(&mut writes);
        assert_eq!(writes.0.len(), 12);
        for (i, write) in writes.0.iter().enumerate() {
            assert_eq!(write[0], 0);
            assert_eq!(write[write.len() - 1], 0);
            assert!(write[1..write.len() - 1].iter().all(|&b| b != 0));
            let message = messages(write);
            assert_eq!(message.len(), 1);
            assert!(message[0].ends_with(std::format!("record number {}", i).as_bytes()));
        }
    }
}
