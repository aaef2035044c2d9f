//! Error types for the keypad bus, the command codec and the host link.
//!
//! Every failure here is recoverable: the bus is shared and unreliable, so a
//! missing or corrupt answer only means "no data this time".

use thiserror::Error;

/// Errors raised while talking to keypads.
///
/// `E` is the transmit pin's error type.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BusError<E> {
    /// Driving the transmit line failed.
    #[error("keypad line fault: {0:?}")]
    Line(E),
    /// An expected byte did not arrive before its deadline.
    #[error("no byte within {0} ms")]
    Timeout(u32),
    /// The frame checksum did not match its contents.
    #[error("checksum mismatch: computed {expected:#04x}, frame carries {found:#04x}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        expected: u8,
        /// Checksum byte carried by the frame.
        found: u8,
    },
    /// A keypad other than the addressed one answered.
    #[error("address mismatch: requested {expected}, answered {found}")]
    AddressMismatch {
        /// Address that was polled.
        expected: u8,
        /// Address echoed in the response.
        found: u8,
    },
}

/// Errors raised while decoding a host status command.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The command ended before the tag's fixed-width value.
    #[error("field '{tag}' is truncated")]
    Truncated {
        /// Offending field tag.
        tag: char,
    },
    /// A field tag was not followed by `=`.
    #[error("field '{tag}' is missing '='")]
    MissingEquals {
        /// Offending field tag.
        tag: char,
    },
    /// A hex field held a non-hex digit.
    #[error("field '{tag}' is not hex")]
    InvalidHex {
        /// Offending field tag.
        tag: char,
    },
    /// A boolean field held something other than `0` or `1`.
    #[error("field '{tag}' is not 0 or 1")]
    InvalidFlag {
        /// Offending field tag.
        tag: char,
    },
}

/// Errors raised while accumulating a host command line.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    /// The line exceeded the buffer before its terminator arrived.
    #[error("command buffer overflow")]
    Overflow,
}

/// Errors returned by one bridge service step.
///
/// Only I/O faults surface here; protocol failures are reported to the host
/// and the step continues.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError<BE, HE> {
    /// The keypad transmit line failed.
    #[error("keypad bus: {0:?}")]
    Bus(BE),
    /// The host serial link failed.
    #[error("host link: {0:?}")]
    Host(HE),
}
