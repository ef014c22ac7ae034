//! Output buffer that turns raw shell bytes into clean text.
//!
//! Consoles interleave ANSI escapes, carriage returns and NULs with the
//! text we care about. The buffer strips those as bytes arrive so every
//! parser downstream works on plain `\n`-separated lines.

use regex::bytes::Regex;

/// Accumulates drained output and searches its tail for prompts.
#[derive(Debug)]
pub struct OutputBuffer {
    buffer: Vec<u8>,

    /// How many bytes from the end to search for prompt patterns.
    search_depth: usize,

    /// A `\r` ended the previous chunk; a leading `\n` completes it.
    pending_cr: bool,
}

impl OutputBuffer {
    /// Create a new buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
            pending_cr: false,
        }
    }

    /// Append raw bytes, stripping ANSI escapes and normalising line ends.
    ///
    /// `\r\n` and a lone `\r` both become `\n`; `\r\r\n` (seen on some
    /// consoles) collapses to a single line end. NUL padding is dropped.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        for &b in &cleaned {
            match b {
                b'\r' => {
                    if !self.pending_cr {
                        self.buffer.push(b'\n');
                    }
                    self.pending_cr = true;
                }
                b'\n' if self.pending_cr => {
                    self.pending_cr = false;
                }
                0 => {}
                _ => {
                    self.pending_cr = false;
                    self.buffer.push(b);
                }
            }
        }
    }

    /// Search only the last `search_depth` bytes for the pattern.
    pub fn search_tail(&self, pattern: &Regex) -> Option<regex::bytes::Match<'_>> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        pattern.find(&self.buffer[start..])
    }

    /// Take the text accumulated so far and reset.
    pub fn take_string(&mut self) -> String {
        let bytes = std::mem::take(&mut self.buffer);
        match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending_cr = false;
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
