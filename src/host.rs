//! Host command line accumulation.

use heapless::Vec;

use crate::consts::HOST_LINE_LEN;
use crate::error::LineError;

/// Collects host bytes into `\n` terminated lines.
///
/// `\r` is ignored and bytes above `0x7F` are stored as NUL, so a line is
/// always valid ASCII. A line reaching `N - 1` characters without a
/// terminator is discarded with [`LineError::Overflow`].
#[derive(Debug, Default)]
pub struct LineReader<const N: usize = HOST_LINE_LEN> {
    buf: Vec<u8, N>,
    complete: bool,
}

impl<const N: usize> LineReader<N> {
    /// Creates an empty reader.
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            complete: false,
        }
    }

    /// Adds one byte. Returns the finished line when `byte` terminates it.
    ///
    /// The returned line is cleared by the next call.
    pub fn feed(&mut self, byte: u8) -> Result<Option<&str>, LineError> {
        if self.complete {
            self.clear();
        }
        match byte {
            b'\r' => Ok(None),
            b'\n' => {
                self.complete = true;
                Ok(Some(self.as_str()))
            }
            _ => {
                let byte = if byte.is_ascii() { byte } else { 0 };
                if self.buf.push(byte).is_err() || self.buf.len() >= N.saturating_sub(1) {
                    self.clear();
                    warn!("host line overflow");
                    return Err(LineError::Overflow);
                }
                Ok(None)
            }
        }
    }

    /// Characters collected since the last terminator.
    pub fn pending(&self) -> usize {
        if self.complete { 0 } else { self.buf.len() }
    }

    /// Drops any partial line.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.complete = false;
    }

    fn as_str(&self) -> &str {
        // Only ASCII is ever stored.
        core::str::from_utf8(&self.buf).unwrap_or_default()
    }
}
