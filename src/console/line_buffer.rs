//! Line buffer for console input.
//!
//! CR finishes a line, BS erases, anything at or above 0x20 is stored, other
//! control bytes are dropped. The 80th stored character finishes the line
//! on its own.

use crate::hal::SerialLine;

/// Maximum visible characters per line.
pub const LINE_SIZE: usize = 80;

pub const CR: u8 = 0x0D;
pub const BACKSPACE: u8 = 0x08;

/// Result of feeding one byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineEvent {
    /// Keep feeding.
    Pending,
    /// Byte stored (echo it).
    Stored(u8),
    /// Last character erased (echo the erase).
    Erased,
    /// Line finished by CR or by reaching capacity.
    Complete,
}

/// Line input buffer
pub struct LineBuffer {
    buf: [u8; LINE_SIZE],
    len: usize,
}

impl LineBuffer {
    /// Create empty buffer
    pub const fn new() -> Self {
        Self {
            buf: [0u8; LINE_SIZE],
            len: 0,
        }
    }

    /// Feed one received byte.
    pub fn push(&mut self, byte: u8) -> LineEvent {
        match byte {
            CR => LineEvent::Complete,
            BACKSPACE => {
                if self.backspace() {
                    LineEvent::Erased
                } else {
                    LineEvent::Pending
                }
            }
            0x20..=0xFF => {
                self.append(byte);
                if self.is_full() {
                    LineEvent::Complete
                } else {
                    LineEvent::Stored(byte)
                }
            }
            _ => LineEvent::Pending,
        }
    }

    /// Block on `serial` until a line completes. The buffer is cleared
    /// first; the finished line is left in it.
    pub fn read_line<S: SerialLine + ?Sized>(&mut self, serial: &mut S) -> &[u8] {
        self.clear();
        while self.push(serial.read_byte()) != LineEvent::Complete {}
        self.as_bytes()
    }

    /// Store a character. Ignored once full.
    fn append(&mut self, c: u8) {
        if self.len < LINE_SIZE {
            self.buf[self.len] = c;
            self.len += 1;
        }
    }

    /// Remove last character. Returns false on an empty buffer.
    pub fn backspace(&mut self) -> bool {
        if self.len > 0 {
            self.len -= 1;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Buffer as text, empty if it holds non-UTF-8 bytes.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(self.as_bytes()).unwrap_or("")
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == LINE_SIZE
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
