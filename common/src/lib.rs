//!
//! Wire protocol spoken between a swarm node and its host over the
//! serial-over-USB link.
//!
//! Every frame on the wire is `0x00 <stuffed message> 0x00`.  Messages from the
//! host start with an opcode ([`commands`]), messages from the node start with
//! an event kind ([`events`]).
//!

#![no_std]

pub mod cobs;
pub use cobs::{DecodeError, DecodeStatus, EncodeError, DELIMITER};

pub mod cursor;
pub use cursor::{Cursor, CursorFull};

pub mod framing;
pub use framing::{FrameError, FrameSync, SyncState};

pub mod commands;
pub use commands::{Command, CommandError, LegAngles, ProgramOptions};

pub mod events;
pub use events::*;

pub mod io;
pub use io::{ByteSink, ByteSource, FrameQueue};

pub mod logging;
pub use logging::{EventLogger, Severity};

#[doc(hidden)]
pub use log as __log;

/// Largest message (opcode + payload) the node accepts from the host.  This
/// also bounds the stuffed bytes the frame synchronizer accumulates.
pub const MAX_MESSAGE_LEN: usize = 100;
