//!
//! Consistent-overhead byte stuffing.
//!
//! Encoding removes every `0x00` from a message so that `0x00` can delimit
//! frames on the wire.  Each run of non-zero bytes is prefixed by its length
//! plus one; a prefix of `0xFF` means the run was cut at 254 bytes and no zero
//! followed it in the original message.
//!

use bitflags::bitflags;

/// Byte reserved for delimiting frames.
pub const DELIMITER: u8 = 0x00;

/// Longest run of data bytes a single code byte can describe.
const MAX_RUN: u8 = 0xFF;

/// Upper bound on the stuffed length of a `src_len` byte message.
pub const fn max_encoded_len(src_len: usize) -> usize {
    if src_len == 0 {
        1
    } else {
        src_len + (src_len + 253) / 254
    }
}

/// Upper bound on the decoded length of `src_len` stuffed bytes.
pub const fn max_decoded_len(src_len: usize) -> usize {
    if src_len == 0 {
        0
    } else {
        src_len - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The destination could not hold the stuffed message.  `written` bytes
    /// of it were produced.
    BufferOverflow { written: usize },
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DecodeStatus: u8 {
        const BUFFER_OVERFLOW = 0x02;
        const ZERO_BYTE_IN_INPUT = 0x04;
        const INPUT_TOO_SHORT = 0x08;
    }
}

/// Decoding failed.  The destination still holds the `written` bytes that were
/// recovered before (or despite) the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    pub status: DecodeStatus,
    pub written: usize,
}

/// Stuff `src` into `dst`, returning the number of bytes written.
///
/// The output never contains [`DELIMITER`]; framing delimiters are the
/// caller's job.
pub fn encode(src: &[u8], dst: &mut [u8]) -> Result<usize, EncodeError> {
    let mut code_idx = 0usize;
    let mut write_idx = 1usize;
    let mut run = 1u8;
    let mut overflow = false;

    let mut read_idx = 0usize;
    while read_idx < src.len() {
        if write_idx >= dst.len() {
            overflow = true;
            break;
        }

        let byte = src[read_idx];
        read_idx += 1;

        if byte == DELIMITER {
            dst[code_idx] = run;
            code_idx = write_idx;
            write_idx += 1;
            run = 1;
        } else {
            dst[write_idx] = byte;
            write_idx += 1;
            run += 1;

            if run == MAX_RUN && read_idx < src.len() {
                dst[code_idx] = run;
                code_idx = write_idx;
                write_idx += 1;
                run = 1;
            }
        }
    }

    if code_idx >= dst.len() {
        overflow = true;
        write_idx = dst.len();
    } else {
        dst[code_idx] = run;
    }

    if overflow {
        Err(EncodeError::BufferOverflow {
            written: write_idx,
        })
    } else {
        Ok(write_idx)
    }
}

/// Unstuff `src` into `dst`, returning the number of bytes written.
///
/// `src` must not include the framing delimiters.
pub fn decode(src: &[u8], dst: &mut [u8]) -> Result<usize, DecodeError> {
    let mut status = DecodeStatus::empty();
    let mut read_idx = 0usize;
    let mut write_idx = 0usize;

    while read_idx < src.len() {
        let code = src[read_idx];
        read_idx += 1;
        if code == DELIMITER {
            status |= DecodeStatus::ZERO_BYTE_IN_INPUT;
            break;
        }

        let mut run = usize::from(code - 1);

        let remaining = src.len() - read_idx;
        if run > remaining {
            status |= DecodeStatus::INPUT_TOO_SHORT;
            run = remaining;
        }

        let room = dst.len() - write_idx;
        if run > room {
            status |= DecodeStatus::BUFFER_OVERFLOW;
            run = room;
        }

        for &byte in &src[read_idx..read_idx + run] {
            if byte == DELIMITER {
                status |= DecodeStatus::ZERO_BYTE_IN_INPUT;
            }
            dst[write_idx] = byte;
            write_idx += 1;
        }
        read_idx += run;

        if status.contains(DecodeStatus::BUFFER_OVERFLOW) || read_idx >= src.len() {
            break;
        }

        if code != MAX_RUN {
            if write_idx >= dst.len() {
                status |= DecodeStatus::BUFFER_OVERFLOW;
                break;
            }
            dst[write_idx] = DELIMITER;
            write_idx += 1;
        }
    }

    if status.is_empty() {
        Ok(write_idx)
    } else {
        Err(DecodeError {
            status,
            written: write_idx,
        })
    }
}
