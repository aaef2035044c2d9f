//! Bit-level framing of bytes on the keypad bus.
//!
//! The keypad bus is an inverted-logic asynchronous serial line. A byte is
//! framed as:
//!
//! | Bit            | Line level                      |
//! |----------------|---------------------------------|
//! | start          | HIGH                            |
//! | data 0..=7     | LOW for `1`, HIGH for `0`, LSB first |
//! | parity (8E1)   | inverted even parity bit        |
//! | stop           | LOW                             |
//!
//! Regular traffic uses even parity. Poll responses are sent without a
//! parity bit.
//!
//! ## Functions
//!
//! - [`parity_bit`]: even parity bit for a data byte
//! - [`line_levels`]: iterator over the line levels of one framed byte
//! - [`level_to_bit`]: converts a sampled line level back to a data bit

/// Returns the even parity bit for `byte`.
///
/// The bit is set when `byte` has an odd number of ones, so that data and
/// parity together always carry an even number of ones.
pub fn parity_bit(byte: u8) -> bool {
    byte.count_ones() % 2 == 1
}

/// Converts a sampled line level into the logical bit it carries.
pub fn level_to_bit(high: bool) -> bool {
    !high
}

/// Iterator over the line levels of one framed byte, start bit first.
///
/// `true` means the line is driven HIGH for that bit time.
#[derive(Debug, Clone)]
pub struct LineLevels {
    byte: u8,
    parity: bool,
    index: u8,
}

impl LineLevels {
    fn len_bits(&self) -> u8 {
        if self.parity { 11 } else { 10 }
    }
}

impl Iterator for LineLevels {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        let total = self.len_bits();
        if self.index >= total {
            return None;
        }
        let i = self.index;
        self.index += 1;
        let level = match i {
            0 => true,
            1..=8 => !level_is_low(self.byte, i - 1),
            _ if i == total - 1 => false,
            _ => !parity_bit(self.byte),
        };
        Some(level)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::from(self.len_bits() - self.index);
        (left, Some(left))
    }
}

impl ExactSizeIterator for LineLevels {}

// A `1` data bit is sent as LOW.
fn level_is_low(byte: u8, bit: u8) -> bool {
    byte & (1 << bit) != 0
}

/// Returns the line levels used to transmit `byte`.
///
/// # Arguments
/// - `byte`: the data byte
/// - `parity`: whether an even parity bit is appended after the data bits
pub fn line_levels(byte: u8, parity: bool) -> LineLevels {
    LineLevels {
        byte,
        parity,
        index: 0,
    }
}
