//! Keypad discovery: the four step poll handshake.
//!
//! The panel discovers keypads by using its transmit line as a clock:
//!
//! 1. hold the line LOW for more than 10 ms to wake the keypads;
//! 2. three times, hold the line HIGH for one byte time then LOW for ~1 ms;
//!    each keypad with pending data answers every probe with a pulse on the
//!    receive line, and each answer advances the [`PollState`];
//! 3. if all three probes were answered (state [`PollState::Step4`]), the
//!    keypads' last answer is a response byte in which a zero in bit `i`
//!    means keypad `16 + i` has data.
//!
//! Poll traffic carries no parity bit.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;
use portable_atomic::{AtomicU8, Ordering};

use crate::consts::{
    BYTE_US, FIRST_KEYPAD_ADDRESS, MAX_KEYPADS, NO_KEYPADS, POLL_WAKE_MS, POLL_WRITE_GAP_US,
    READ_TIMEOUT_MS,
};
use crate::error::BusError;
use crate::transport::KeypadSerial;

/// Step of the poll handshake.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[repr(u8)]
pub enum PollState {
    /// No poll in progress.
    #[default]
    Idle = 0,
    /// Wake condition sent, waiting for the answer to the first probe.
    Step1 = 1,
    /// First probe answered.
    Step2 = 2,
    /// Second probe answered; the next answer starts the response byte.
    Step3 = 3,
    /// Third probe answered; the response byte is being received.
    Step4 = 4,
}

impl PollState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PollState::Step1,
            2 => PollState::Step2,
            3 => PollState::Step3,
            4 => PollState::Step4,
            _ => PollState::Idle,
        }
    }

    /// The state one qualifying edge later, if the handshake can advance.
    pub fn next(self) -> Option<Self> {
        match self {
            PollState::Step1 => Some(PollState::Step2),
            PollState::Step2 => Some(PollState::Step3),
            PollState::Step3 => Some(PollState::Step4),
            PollState::Idle | PollState::Step4 => None,
        }
    }
}

/// Atomic cell holding the [`PollState`] shared with the edge interrupt.
///
/// The foreground only ever stores `Step1` or `Idle`; the interrupt only
/// ever advances by one step with a compare-and-swap.
#[derive(Debug)]
pub struct PollCell(AtomicU8);

impl Default for PollCell {
    fn default() -> Self {
        Self::new()
    }
}

impl PollCell {
    /// Creates an idle cell.
    pub const fn new() -> Self {
        Self(AtomicU8::new(PollState::Idle as u8))
    }

    /// Reads the current state.
    pub fn load(&self) -> PollState {
        PollState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Begins a poll cycle.
    pub fn start(&self) {
        self.0.store(PollState::Step1 as u8, Ordering::Release);
    }

    /// Ends the poll cycle.
    pub fn reset(&self) {
        self.0.store(PollState::Idle as u8, Ordering::Release);
    }

    /// Advances one step. Returns `false` when idle or already at `Step4`.
    pub fn advance(&self) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |value| {
                PollState::from_u8(value).next().map(|next| next as u8)
            })
            .is_ok()
    }
}

/// Ascending set of keypad addresses that answered a poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeypadAddresses(Vec<u8, MAX_KEYPADS>);

impl KeypadAddresses {
    /// Decodes a poll response byte.
    ///
    /// Each zero bit `i` means keypad `16 + i` answered. `0xFF` means no
    /// keypad answered.
    pub fn from_response(mask: u8) -> Self {
        let mut addresses = Vec::new();
        if mask != NO_KEYPADS {
            for bit in 0..8u8 {
                if mask & (1 << bit) == 0 {
                    // Capacity is eight, one per bit.
                    let _ = addresses.push(FIRST_KEYPAD_ADDRESS + bit);
                }
            }
        }
        Self(addresses)
    }

    /// The addresses, ascending.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Number of keypads that answered.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no keypad answered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `address` answered.
    pub fn contains(&self, address: u8) -> bool {
        self.0.contains(&address)
    }

    /// Iterates the addresses in ascending order.
    pub fn iter(&self) -> core::slice::Iter<'_, u8> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a KeypadAddresses {
    type Item = &'a u8;
    type IntoIter = core::slice::Iter<'a, u8>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<TX, RX, D> KeypadSerial<'_, TX, RX, D>
where
    TX: OutputPin,
    RX: InputPin,
    D: DelayNs,
{
    /// Runs one poll cycle and returns the keypads that answered.
    ///
    /// Parity is disabled for the duration of the cycle and restored before
    /// returning, also on error. Each call fully replaces the previous
    /// result.
    pub fn poll(&mut self) -> Result<KeypadAddresses, BusError<TX::Error>> {
        let bus = self.bus();
        self.flush_input();
        bus.set_parity(false);
        bus.poll_cell().start();

        let result = self.clock_poll();

        bus.poll_cell().reset();
        bus.set_parity(true);

        let mask = result?;
        let addresses = KeypadAddresses::from_response(mask);
        debug!("poll response {:#x}, {} keypad(s)", mask, addresses.len());
        Ok(addresses)
    }

    fn clock_poll(&mut self) -> Result<u8, BusError<TX::Error>> {
        self.drive(false)?;
        self.delay_ms(POLL_WAKE_MS);
        for _ in 0..3 {
            self.probe()?;
        }
        self.release_line()?;

        let state = self.bus().poll_state();
        if state != PollState::Step4 {
            trace!("poll stopped at step {}", state as u8);
            return Ok(NO_KEYPADS);
        }
        Ok(self.receive_byte(READ_TIMEOUT_MS).unwrap_or(NO_KEYPADS))
    }

    // Holds the line high for one byte time. An answer to the third probe
    // starts the response byte, which may still be arriving when this returns.
    fn probe(&mut self) -> Result<(), BusError<TX::Error>> {
        self.drive(true)?;
        self.delay_us(BYTE_US);
        self.drive(false)?;
        self.delay_us(POLL_WRITE_GAP_US);
        Ok(())
    }
}
