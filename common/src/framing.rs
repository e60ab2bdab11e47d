//!
//! Byte-at-a-time frame synchronizer for the host -> node direction.
//!
//! A frame is `0x00 <stuffed message> 0x00`.  The host always sends both
//! delimiters, so the end of one frame is immediately followed by the start of
//! the next.  After noise or an overflow the synchronizer skips to the next
//! `0x00` and collects from there.  If that delimiter was really an end of
//! frame, the start delimiter that follows it is absorbed like any other
//! repeated delimiter.
//!

use heapless::Vec;

use crate::cobs::{self, DecodeError, DELIMITER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Discarding bytes until a delimiter.
    SeekEnd,
    /// Expecting a start-of-frame delimiter.
    SeekStart,
    /// Collecting stuffed bytes of a frame.
    Accumulating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The frame grew past the accumulator capacity and was dropped.
    Overflow,
    /// The frame was complete but did not unstuff cleanly.
    Decode(DecodeError),
}

/// Accumulates at most `N` stuffed bytes per frame.
pub struct FrameSync<const N: usize> {
    state: SyncState,
    buffer: Vec<u8, N>,
}

impl<const N: usize> FrameSync<N> {
    pub const fn new() -> Self {
        Self {
            state: SyncState::SeekStart,
            buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Stuffed bytes collected for the frame in progress.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = SyncState::SeekStart;
    }

    /// Feed one byte from the link.
    ///
    /// Returns `Ok(Some(len))` once a frame completes and its `len` byte
    /// message has been unstuffed into `message`.  On `Err` the frame is
    /// dropped and synchronization continues with the next byte.
    pub fn push(&mut self, byte: u8, message: &mut [u8]) -> Result<Option<usize>, FrameError> {
        match self.state {
            SyncState::SeekEnd => {
                if byte == DELIMITER {
                    self.state = SyncState::Accumulating;
                }
                Ok(None)
            }
            SyncState::SeekStart => {
                self.state = if byte == DELIMITER {
                    SyncState::Accumulating
                } else {
                    SyncState::SeekEnd
                };
                Ok(None)
            }
            SyncState::Accumulating if byte != DELIMITER => {
                if self.buffer.push(byte).is_err() {
                    self.buffer.clear();
                    self.state = SyncState::SeekEnd;
                    return Err(FrameError::Overflow);
                }
                Ok(None)
            }
            SyncState::Accumulating => {
                // Back to back delimiters: the previous one was an end of frame
                // and this one starts the frame.
                if self.buffer.is_empty() {
                    return Ok(None);
                }

                let result = cobs::decode(&self.buffer, message);
                self.buffer.clear();
                self.state = SyncState::SeekStart;
                result.map(Some).map_err(FrameError::Decode)
            }
        }
    }
}

impl<const N: usize> Default for FrameSync<N> {
    fn default() -> Self {
        Self::new()
    }
}
