//!
//! Byte-level seams between the protocol and the serial link.
//!

use heapless::Deque;

use crate::cobs::DELIMITER;

/// Non-blocking byte input.  `None` means nothing is available right now, not
/// that the stream has ended.
pub trait ByteSource {
    fn read_byte(&mut self) -> Option<u8>;
}

/// Byte output.  Implementations take a whole frame at a time so that frames
/// are never interleaved.
pub trait ByteSink {
    fn write_all(&mut self, bytes: &[u8]);
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    fn write_all(&mut self, bytes: &[u8]) {
        (**self).write_all(bytes)
    }
}

/// Bounded queue of `0x00 <stuffed> 0x00` frames.
///
/// A frame is queued whole or not at all, so whatever the queue hands on is
/// always a sequence of complete frames.
pub struct FrameQueue<const N: usize> {
    bytes: Deque<u8, N>,
    dropped: u32,
}

impl<const N: usize> FrameQueue<N> {
    pub const fn new() -> Self {
        Self {
            bytes: Deque::new(),
            dropped: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Queued bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Queue `frame` if all of it fits.  A frame that does not fit is counted
    /// as dropped.
    pub fn push_frame(&mut self, frame: &[u8]) -> bool {
        if N - self.bytes.len() < frame.len() {
            self.dropped = self.dropped.saturating_add(1);
            return false;
        }
        for &byte in frame {
            // room was checked above
            let _ = self.bytes.push_back(byte);
        }
        true
    }

    /// Frames dropped since the last call.
    pub fn take_dropped(&mut self) -> u32 {
        core::mem::take(&mut self.dropped)
    }

    /// Move the oldest frame into `out`, returning its length.  A frame longer
    /// than `out` is discarded and counted as dropped.
    pub fn pop_frame(&mut self, out: &mut [u8]) -> Option<usize> {
        loop {
            let mut len = 0;
            let mut fits = true;
            while let Some(byte) = self.bytes.pop_front() {
                if len < out.len() {
                    out[len] = byte;
                } else {
                    fits = false;
                }
                len += 1;
                if byte == DELIMITER && len > 1 {
                    break;
                }
            }

            if len == 0 {
                return None;
            }
            if fits {
                return Some(len);
            }
            self.dropped = self.dropped.saturating_add(1);
        }
    }

    /// Offer queued bytes to `write` until it stops accepting them.  `write`
    /// returns how many of the offered bytes it took.  Returns the total taken.
    pub fn pump<W: FnMut(&[u8]) -> usize>(&mut self, mut write: W) -> usize {
        let mut sent = 0;
        while !self.bytes.is_empty() {
            let (front, _) = self.bytes.as_slices();
            let accepted = write(front).min(front.len());
            if accepted == 0 {
                break;
            }
            for _ in 0..accepted {
                self.bytes.pop_front();
            }
            sent += accepted;
        }
        sent
    }
}

impl<const N: usize> Default for FrameQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
