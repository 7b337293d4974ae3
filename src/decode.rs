//! Byte-level line assembly and permissive text decoding.
//!
//! Nothing here touches I/O: the connection feeds raw reads into a
//! [`LineAssembler`] and the capture loop turns completed lines into text
//! with [`decode_permissive`].

use std::borrow::Cow;

const TERMINATOR: u8 = b'\n';

/// Decodes UTF-8, dropping every undecodable byte span instead of failing.
///
/// A multi-byte sequence cut off at the end of the input is dropped as well.
pub fn decode_permissive(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                if let Ok(valid) = std::str::from_utf8(valid) {
                    out.push_str(valid);
                }
                match e.error_len() {
                    Some(len) => rest = &after[len..],
                    None => break,
                }
            }
        }
    }
    Cow::Owned(out)
}

fn is_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

/// Accumulates raw reads and yields complete lines without their terminator.
///
/// Bytes of an unfinished line stay buffered across reads (and across read
/// timeouts) until the terminator arrives, so multi-byte characters are
/// never split between two records. A line growing past `max_len` without a
/// terminator is emitted in chunks of at most `max_len` bytes, cut on a
/// character boundary.
#[derive(Debug)]
pub struct LineAssembler {
    buf: Vec<u8>,
    max_len: usize,
}

impl LineAssembler {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_len: max_len.max(1),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        if let Some(pos) = self.buf.iter().position(|&b| b == TERMINATOR) {
            if pos <= self.max_len {
                let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                line.pop();
                return Some(line);
            }
        }
        if self.buf.len() > self.max_len {
            let cut = self.chunk_boundary();
            return Some(self.buf.drain(..cut).collect());
        }
        None
    }

    /// Backs the `max_len` cut off a UTF-8 continuation byte so a character
    /// is never split between two chunks.
    fn chunk_boundary(&self) -> usize {
        let mut cut = self.max_len;
        for _ in 0..3 {
            if cut == 0 || !is_continuation(self.buf[cut]) {
                break;
            }
            cut -= 1;
        }
        if cut == 0 {
            self.max_len
        } else {
            cut
        }
    }

    /// Takes whatever unterminated bytes remain, if any.
    pub fn take_partial(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
