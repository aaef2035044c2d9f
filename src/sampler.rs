//! Edge-started byte sampler for the keypad bus receive line.
//!
//! Reception is split across two interrupts. The pin-change interrupt sees
//! the rising edge of a start bit and arms the sampler with
//! [`ByteSampler::start`]. The sampling timer then calls
//! [`ByteSampler::update`] every tick; the first data bit is sampled one and
//! a half bit times after the start edge and every following bit one bit
//! time later, so every sample lands near the middle of its bit.
//!
//! Neither entry point blocks; each call does a bounded amount of work.

use embedded_hal::digital::InputPin;

use crate::consts::TICKS_PER_BIT;
use crate::encoding::{level_to_bit, parity_bit};

/// Outcome of one sampler update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// No byte finished on this tick.
    Pending,
    /// A byte was assembled and its parity (if enabled) checked out.
    Byte(u8),
    /// A byte was assembled but its parity bit was wrong.
    ParityError(u8),
}

#[derive(Debug)]
/// Assembles one byte from the receive line, sampling once per bit.
///
// - `countdown`: ticks left until the next sample
// - `bit`: index of the next bit to sample, 0..=7 data, 8 parity
pub struct ByteSampler {
    /// Set by [`ByteSampler::start`], cleared once the last bit was sampled.
    active: bool,

    /// Ticks remaining until the next bit sample.
    countdown: u8,

    /// Index of the next bit to sample.
    bit: u8,

    /// Data bits collected so far, LSB first.
    shift: u8,

    /// Whether this byte carries a parity bit.
    parity: bool,
}

impl Default for ByteSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSampler {
    /// Creates an idle sampler.
    pub const fn new() -> Self {
        Self {
            active: false,
            countdown: 0,
            bit: 0,
            shift: 0,
            parity: false,
        }
    }

    /// Arms the sampler at the leading edge of a start bit.
    ///
    /// # Arguments
    /// - `parity`: whether a parity bit follows the eight data bits
    pub fn start(&mut self, parity: bool) {
        self.active = true;
        self.countdown = TICKS_PER_BIT + TICKS_PER_BIT / 2;
        self.bit = 0;
        self.shift = 0;
        self.parity = parity;
    }

    /// Whether a byte is currently being assembled.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Abandons any byte in progress.
    pub fn reset(&mut self) {
        self.active = false;
    }

    /// Advances the sampler by one tick, sampling `rx` when a bit is due.
    ///
    /// Read errors are treated as a LOW line.
    pub fn update<RX: InputPin>(&mut self, rx: &mut RX) -> Sample {
        if !self.active {
            return Sample::Pending;
        }
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            return Sample::Pending;
        }
        self.countdown = TICKS_PER_BIT;

        let bit = level_to_bit(rx.is_high().unwrap_or(false));
        if self.bit < 8 {
            if bit {
                self.shift |= 1 << self.bit;
            }
            self.bit += 1;
            if self.bit < 8 || self.parity {
                return Sample::Pending;
            }
            self.active = false;
            return Sample::Byte(self.shift);
        }

        self.active = false;
        if bit == parity_bit(self.shift) {
            Sample::Byte(self.shift)
        } else {
            Sample::ParityError(self.shift)
        }
    }
}
