//!
//! Messages sent from a node to the host.
//!
//! An event is one kind byte followed by a body whose layout is fixed by the
//! kind.  Events are laid out in full before anything is written, so an event
//! that does not fit is rejected rather than partially sent.
//!

use core::fmt::{self, Write};

use crate::cobs::{self, max_encoded_len, EncodeError, DELIMITER};
use crate::cursor::{Cursor, CursorFull};
use crate::io::ByteSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    StateSnapshot = 0,
    RawBytes = 1,
    StringMessage = 2,
    LogRecord = 3,
    CurrentSensor = 4,
    DigitalInputs = 5,
    Imu = 6,
    LoopPerf = 7,
}

/// Largest event (kind byte + body).
pub const MAX_EVENT_LEN: usize = 128;
/// Largest framed event on the wire, delimiters included.
pub const MAX_EVENT_FRAME_LEN: usize = max_encoded_len(MAX_EVENT_LEN) + 2;
/// Largest log record body: file tag, severity, line and text.
pub const MAX_LOG_RECORD_LEN: usize = 100;
/// Bytes of a log record body that are not file tag or text.
const LOG_RECORD_HEADER_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitError {
    BodyTooLarge(CursorFull),
    Encode(EncodeError),
}

pub trait Event {
    const KIND: EventKind;

    fn write_body(&self, body: &mut Cursor<'_>) -> Result<(), CursorFull>;
}

/// Frame an already laid out message as `0x00 <stuffed> 0x00`.
pub fn frame_message(message: &[u8], frame: &mut [u8]) -> Result<usize, EncodeError> {
    if frame.len() < 2 {
        return Err(EncodeError::BufferOverflow { written: 0 });
    }

    let end = frame.len() - 1;
    frame[0] = DELIMITER;
    let len = cobs::encode(message, &mut frame[1..end])?;
    frame[len + 1] = DELIMITER;
    Ok(len + 2)
}

/// Lay out and frame `event`, returning the framed length.
pub fn encode_event<E: Event>(
    event: &E,
    frame: &mut [u8; MAX_EVENT_FRAME_LEN],
) -> Result<usize, EmitError> {
    let mut message = [0u8; MAX_EVENT_LEN];
    let mut cursor = Cursor::new(&mut message);
    cursor.put_u8(E::KIND as u8).map_err(EmitError::BodyTooLarge)?;
    event.write_body(&mut cursor).map_err(EmitError::BodyTooLarge)?;
    let len = cursor.position();

    frame_message(&message[..len], frame).map_err(EmitError::Encode)
}

/// Write `event` to `sink` as a single frame.
pub fn emit<S: ByteSink + ?Sized, E: Event>(sink: &mut S, event: &E) -> Result<(), EmitError> {
    let mut frame = [0u8; MAX_EVENT_FRAME_LEN];
    let len = encode_event(event, &mut frame)?;
    sink.write_all(&frame[..len]);
    Ok(())
}

/// Levels of the four charge lines and the connection-detect line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigitalInputs {
    pub charge: [bool; 4],
    pub connected: bool,
}

impl DigitalInputs {
    fn write(&self, body: &mut Cursor<'_>) -> Result<(), CursorFull> {
        for charged in self.charge {
            body.put_bool(charged)?;
        }
        body.put_bool(self.connected)
    }
}

impl Event for DigitalInputs {
    const KIND: EventKind = EventKind::DigitalInputs;

    fn write_body(&self, body: &mut Cursor<'_>) -> Result<(), CursorFull> {
        self.write(body)
    }
}

/// Sent once at startup so the host can learn the initial input levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub inputs: DigitalInputs,
}

impl Event for StateSnapshot {
    const KIND: EventKind = EventKind::StateSnapshot;

    fn write_body(&self, body: &mut Cursor<'_>) -> Result<(), CursorFull> {
        self.inputs.write(body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBytes<'a>(pub &'a [u8]);

impl Event for RawBytes<'_> {
    const KIND: EventKind = EventKind::RawBytes;

    fn write_body(&self, body: &mut Cursor<'_>) -> Result<(), CursorFull> {
        body.put_bytes(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringMessage<'a>(pub &'a str);

impl Event for StringMessage<'_> {
    const KIND: EventKind = EventKind::StringMessage;

    fn write_body(&self, body: &mut Cursor<'_>) -> Result<(), CursorFull> {
        body.put_bytes(self.0.as_bytes())
    }
}

/// A log record still holding its unformatted text.
#[derive(Clone, Copy)]
pub struct LogRecord<'a> {
    /// Source file tag, without directories.
    pub file: &'a str,
    pub severity: u8,
    pub line: u32,
    pub text: fmt::Arguments<'a>,
}

impl LogRecord<'_> {
    /// Lay out the body into `body`, truncating the text (and if need be the
    /// file tag) to fit.  Returns the body length.
    pub fn encode_body(&self, body: &mut [u8; MAX_LOG_RECORD_LEN]) -> usize {
        let file = self.file.as_bytes();
        let file = &file[..file.len().min(MAX_LOG_RECORD_LEN - LOG_RECORD_HEADER_LEN)];

        let mut header = [0u8; LOG_RECORD_HEADER_LEN];
        header[1] = self.severity;
        header[2..].copy_from_slice(&self.line.to_be_bytes());

        let mut cursor = Cursor::new(body);
        cursor.put_truncated(file);
        cursor.put_truncated(&header);
        // running out of room only truncates the text
        let _ = cursor.write_fmt(self.text);
        cursor.position()
    }
}

impl Event for LogRecord<'_> {
    const KIND: EventKind = EventKind::LogRecord;

    fn write_body(&self, body: &mut Cursor<'_>) -> Result<(), CursorFull> {
        let mut record = [0u8; MAX_LOG_RECORD_LEN];
        let len = self.encode_body(&mut record);
        body.put_bytes(&record[..len])
    }
}

/// A log record body laid out earlier by [`LogRecord::encode_body`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedLogRecord<'a>(pub &'a [u8]);

impl Event for EncodedLogRecord<'_> {
    const KIND: EventKind = EventKind::LogRecord;

    fn write_body(&self, body: &mut Cursor<'_>) -> Result<(), CursorFull> {
        body.put_bytes(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CurrentTelemetry {
    pub shunt_voltage_nv: i32,
    pub bus_voltage_uv: u32,
    pub power_uw: u32,
    /// Energy since boot in microjoules.
    pub energy_uj: u64,
    pub current_ua: u32,
}

impl Event for CurrentTelemetry {
    const KIND: EventKind = EventKind::CurrentSensor;

    fn write_body(&self, body: &mut Cursor<'_>) -> Result<(), CursorFull> {
        body.put_i32(self.shunt_voltage_nv)?;
        body.put_u32(self.bus_voltage_uv)?;
        body.put_u32(self.power_uw)?;
        body.put_u64(self.energy_uj)?;
        body.put_u32(self.current_ua)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuTelemetry {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Degrees per second.
    pub angular_velocity: [f32; 3],
    /// Degrees.
    pub heading: [f64; 3],
    /// m/s^2.
    pub acceleration: [f32; 3],
    /// m/s.
    pub velocity: [f64; 3],
    /// m.
    pub displacement: [f64; 3],
}

impl Event for ImuTelemetry {
    const KIND: EventKind = EventKind::Imu;

    fn write_body(&self, body: &mut Cursor<'_>) -> Result<(), CursorFull> {
        body.put_f32(self.temperature)?;
        for value in self.angular_velocity {
            body.put_f32(value)?;
        }
        for value in self.heading {
            body.put_f64(value)?;
        }
        for value in self.acceleration {
            body.put_f32(value)?;
        }
        for value in self.velocity {
            body.put_f64(value)?;
        }
        for value in self.displacement {
            body.put_f64(value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopPerfTelemetry {
    /// Loop iterations that found no work.
    pub idle_count: u16,
    /// Microseconds covered by the report.
    pub elapsed_us: u32,
}

impl Event for LoopPerfTelemetry {
    const KIND: EventKind = EventKind::LoopPerf;

    fn write_body(&self, body: &mut Cursor<'_>) -> Result<(), CursorFull> {
        body.put_u16(self.idle_count)?;
        body.put_u32(self.elapsed_us)
    }
}
