//! Line buffer for console input.

use crate::config::CONSOLE_LINE_LEN;

/// Fixed-capacity input line under construction.
pub struct LineBuffer {
    buf: [u8; CONSOLE_LINE_LEN],
    len: usize,
}

impl LineBuffer {
    /// Create empty buffer.
    pub const fn new() -> Self {
        Self {
            buf: [0u8; CONSOLE_LINE_LEN],
            len: 0,
        }
    }

    /// Push a byte. Returns `false` when the line is full.
    pub fn push(&mut self, c: u8) -> bool {
        if self.len < CONSOLE_LINE_LEN {
            self.buf[self.len] = c;
            self.len += 1;
            true
        } else {
            false
        }
    }

    /// Remove the last byte.
    pub fn backspace(&mut self) {
        if self.len > 0 {
            self.len -= 1;
        }
    }

    /// Clear buffer.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Current contents as a string slice.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
