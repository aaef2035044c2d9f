//! Keypad data requests.
//!
//! After a poll names the keypads with pending data, the panel asks each of
//! them in turn with `[0xF6, address]`, reads the answer, checks it and, if
//! it is good, acknowledges it by echoing the frame's first byte. A keypad
//! keeps repeating an unacknowledged frame on later polls, so a rejected
//! frame is simply dropped here.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::consts::{ACK_DELAY_BITS, FRAME_BUF_LEN, READ_TIMEOUT_MS, REQUEST_DATA_OPCODE};
use crate::error::BusError;
use crate::frame::{FrameKind, HEADER_LEN, RawFrame, frame_address, verify_checksum};
use crate::transport::KeypadSerial;

/// The bus operations a [`Transceiver`] needs.
///
/// Implemented by [`KeypadSerial`]; tests drive the transceiver with a
/// scripted link instead.
pub trait KeypadLink {
    /// Error raised by the transmit line.
    type Error;

    /// Writes `bytes` as one transmission.
    fn send(&mut self, bytes: &[u8]) -> Result<(), BusError<Self::Error>>;

    /// Waits up to `timeout_ms` for one received byte.
    fn receive_byte(&mut self, timeout_ms: u32) -> Option<u8>;

    /// Waits `bits` bit times.
    fn delay_bits(&mut self, bits: u32);

    /// Discards bytes already received.
    fn flush_input(&mut self);
}

impl<TX, RX, D> KeypadLink for KeypadSerial<'_, TX, RX, D>
where
    TX: OutputPin,
    RX: InputPin,
    D: DelayNs,
{
    type Error = TX::Error;

    fn send(&mut self, bytes: &[u8]) -> Result<(), BusError<Self::Error>> {
        KeypadSerial::send(self, bytes)
    }

    fn receive_byte(&mut self, timeout_ms: u32) -> Option<u8> {
        KeypadSerial::receive_byte(self, timeout_ms)
    }

    fn delay_bits(&mut self, bits: u32) {
        KeypadSerial::delay_bits(self, bits);
    }

    fn flush_input(&mut self) {
        KeypadSerial::flush_input(self);
    }
}

/// Outcome counters for data requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames accepted and acknowledged.
    pub good: u32,
    /// Requests that went unanswered or were cut short.
    pub timeouts: u32,
    /// Frames rejected for a bad checksum.
    pub bad_checksum: u32,
    /// Frames answered by a keypad other than the one asked.
    pub bad_address: u32,
}

/// An accepted keypad frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeypadMessage {
    /// Address the request was sent to.
    pub address: u8,
    /// Shape of the frame.
    pub kind: FrameKind,
    /// Every byte read, checksum included.
    pub frame: RawFrame,
}

impl KeypadMessage {
    /// Key bytes of a [`FrameKind::Keys`] frame, without header and
    /// checksum. Empty for other kinds.
    pub fn keys(&self) -> &[u8] {
        if !self.kind.is_keys() {
            return &[];
        }
        let end = self.frame.len().saturating_sub(1);
        self.frame.get(HEADER_LEN..end).unwrap_or(&[])
    }
}

/// Requests, validates and acknowledges keypad frames.
#[derive(Debug, Default)]
pub struct Transceiver {
    stats: FrameStats,
}

impl Transceiver {
    /// Creates a transceiver with zeroed counters.
    pub const fn new() -> Self {
        Self {
            stats: FrameStats {
                good: 0,
                timeouts: 0,
                bad_checksum: 0,
                bad_address: 0,
            },
        }
    }

    /// Counters collected so far.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Asks the keypad at `address` for its pending frame.
    ///
    /// Returns the frame once it has been validated and acknowledged. Every
    /// protocol failure is recoverable; the keypad will offer the same frame
    /// again on a later poll.
    pub fn request<L: KeypadLink>(
        &mut self,
        link: &mut L,
        address: u8,
    ) -> Result<KeypadMessage, BusError<L::Error>> {
        link.flush_input();
        link.send(&[REQUEST_DATA_OPCODE, address])?;

        let (kind, frame) = match read_frame(link) {
            Ok(read) => read,
            Err(err) => {
                self.stats.timeouts = self.stats.timeouts.saturating_add(1);
                trace!("keypad {} did not answer", address);
                return Err(err);
            }
        };

        link.delay_bits(ACK_DELAY_BITS);

        let found = frame_address(&frame).unwrap_or_default();
        if found != address {
            self.stats.bad_address = self.stats.bad_address.saturating_add(1);
            warn!("request to keypad {} answered by {}", address, found);
            return Err(BusError::AddressMismatch {
                expected: address,
                found,
            });
        }
        if let Err((expected, found)) = verify_checksum(&frame) {
            self.stats.bad_checksum = self.stats.bad_checksum.saturating_add(1);
            warn!(
                "keypad {} frame checksum {:#x}, expected {:#x}",
                address, found, expected
            );
            return Err(BusError::ChecksumMismatch { expected, found });
        }

        link.send(&frame[..1])?;
        self.stats.good = self.stats.good.saturating_add(1);
        debug!("keypad {} sent {} byte frame", address, frame.len());
        Ok(KeypadMessage {
            address,
            kind,
            frame,
        })
    }
}

fn read_frame<L: KeypadLink>(link: &mut L) -> Result<(FrameKind, RawFrame), BusError<L::Error>> {
    let mut frame = RawFrame::new();
    for _ in 0..HEADER_LEN {
        push_required(link, &mut frame)?;
    }
    let kind = FrameKind::classify([frame[0], frame[1]]);

    match kind.total_len() {
        Some(len) => {
            while frame.len() < len {
                push_required(link, &mut frame)?;
            }
        }
        None => {
            while frame.len() < FRAME_BUF_LEN {
                let Some(byte) = link.receive_byte(READ_TIMEOUT_MS) else {
                    break;
                };
                // Length checked by the loop condition.
                let _ = frame.push(byte);
            }
        }
    }
    Ok((kind, frame))
}

fn push_required<L: KeypadLink>(
    link: &mut L,
    frame: &mut RawFrame,
) -> Result<(), BusError<L::Error>> {
    let byte = link
        .receive_byte(READ_TIMEOUT_MS)
        .ok_or(BusError::Timeout(READ_TIMEOUT_MS))?;
    frame.push(byte).map_err(|_| BusError::Timeout(READ_TIMEOUT_MS))
}
