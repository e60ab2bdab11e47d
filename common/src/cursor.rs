//!
//! Bounded writer used to lay out message bodies without allocation.
//!
//! Integers are written big-endian.  Floating point values are written in the
//! node's native (little-endian) order, which is what the host unpacks.
//!

/// A write did not fit in the remaining space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorFull {
    pub needed: usize,
    pub remaining: usize,
}

pub struct Cursor<'a> {
    buffer: &'a mut [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// The bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    /// Write all of `bytes` or nothing.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), CursorFull> {
        if bytes.len() > self.remaining() {
            return Err(CursorFull {
                needed: bytes.len(),
                remaining: self.remaining(),
            });
        }

        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        Ok(())
    }

    /// Write as much of `bytes` as fits, returning how many were written.
    pub fn put_truncated(&mut self, bytes: &[u8]) -> usize {
        let len = bytes.len().min(self.remaining());
        self.buffer[self.position..self.position + len].copy_from_slice(&bytes[..len]);
        self.position += len;
        len
    }

    pub fn put_u8(&mut self, value: u8) -> Result<(), CursorFull> {
        self.put_bytes(&[value])
    }

    pub fn put_bool(&mut self, value: bool) -> Result<(), CursorFull> {
        self.put_u8(value as u8)
    }

    pub fn put_u16(&mut self, value: u16) -> Result<(), CursorFull> {
        self.put_bytes(&value.to_be_bytes())
    }

    pub fn put_i16(&mut self, value: i16) -> Result<(), CursorFull> {
        self.put_bytes(&value.to_be_bytes())
    }

    pub fn put_u32(&mut self, value: u32) -> Result<(), CursorFull> {
        self.put_bytes(&value.to_be_bytes())
    }

    pub fn put_i32(&mut self, value: i32) -> Result<(), CursorFull> {
        self.put_bytes(&value.to_be_bytes())
    }

    pub fn put_u64(&mut self, value: u64) -> Result<(), CursorFull> {
        self.put_bytes(&value.to_be_bytes())
    }

    pub fn put_f32(&mut self, value: f32) -> Result<(), CursorFull> {
        self.put_bytes(&value.to_le_bytes())
    }

    pub fn put_f64(&mut self, value: f64) -> Result<(), CursorFull> {
        self.put_bytes(&value.to_le_bytes())
    }
}

impl core::fmt::Write for Cursor<'_> {
    /// Formats as much as fits and reports an error once the buffer is full.
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        if self.put_truncated(s.as_bytes()) == s.len() {
            Ok(())
        } else {
            Err(core::fmt::Error)
        }
    }
}
