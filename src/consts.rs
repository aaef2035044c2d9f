//! Constants used across the keypad bus implementation.
//!
//! This module defines the line timing, buffer sizing and opcodes of the
//! alarm-panel keypad bus. The timing values were measured on a live panel
//! and must be used exactly as given; they are protocol constants, not
//! tunables.
//!
//! ## Key Concepts
//!
//! - **Line timing**: the bus runs at ~4800 baud, 8 data bits, even parity,
//!   with inverted line logic (a start bit is HIGH).
//! - **Polling**: discovery holds the line low for longer than 10 ms, then
//!   clocks three one-byte "probes" onto the bus.
//! - **Frames**: keypad responses are variable length and end in a one byte
//!   checksum.
//! - **Status messages**: the panel's `F7` display message is a fixed
//!   48 byte record.

/// Keypad bus baud rate.
pub const KP_BAUD: u32 = 4_800;

/// Duration of one bit on the bus, in microseconds (~1/4800 s).
pub const BIT_US: u32 = 208;

/// Duration the line is held high for one poll probe, in microseconds.
///
/// This is one 10-bit word: start, eight data bits and parity.
pub const BYTE_US: u32 = 2_030;

/// Low time between consecutive poll probes, in microseconds.
pub const POLL_WRITE_GAP_US: u32 = 1_015;

/// Time the transmit line is dropped before a regular write, in microseconds.
pub const LOW_BEFORE_WRITE_US: u32 = 4_060;

/// Time the transmit line is held low to wake keypads for a poll, in milliseconds.
///
/// Keypads require more than 10 ms.
pub const POLL_WAKE_MS: u32 = 13;

/// Per-byte receive timeout, in milliseconds.
pub const READ_TIMEOUT_MS: u32 = 10;

/// Number of sampling ticks per bit.
///
/// The sampling timer interrupt must fire every [`TICK_US`] microseconds.
pub const TICKS_PER_BIT: u8 = 4;

/// Sampling tick period, in microseconds.
pub const TICK_US: u32 = BIT_US / TICKS_PER_BIT as u32;

/// Interval between checks of the receive queue while waiting for a byte.
pub const RX_POLL_STEP_US: u32 = 100;

/// Number of bit times to wait after a frame before acknowledging it.
pub const ACK_DELAY_BITS: u32 = 2;

/// Maximum number of keypads on one bus.
pub const MAX_KEYPADS: usize = 8;

/// Address of the keypad reported by bit 0 of a poll response.
pub const FIRST_KEYPAD_ADDRESS: u8 = 16;

/// Poll response byte meaning no keypad answered.
pub const NO_KEYPADS: u8 = 0xFF;

/// Capacity of a keypad response frame buffer.
pub const FRAME_BUF_LEN: usize = 64;

/// Capacity of the interrupt-side receive queue.
pub const RX_QUEUE_LEN: usize = 64;

/// Opcode asking one keypad to send its pending data.
pub const REQUEST_DATA_OPCODE: u8 = 0xF6;

/// Opcode of the status display message.
pub const STATUS_OPCODE: u8 = 0xF7;

/// Message type sent by a keypad after power-up; fixed 9 byte frame.
pub const POWER_UP_OPCODE: u8 = 0x87;

/// Total length of a power-up frame.
pub const POWER_UP_FRAME_LEN: usize = 9;

/// Largest second header byte that is read as a key message body length.
pub const MAX_KEYS_BODY_LEN: u8 = 16;

/// Mask applied to a response's first byte to recover the keypad address.
pub const ADDRESS_MASK: u8 = 0x3F;

/// Size of the status display message.
pub const STATUS_MSG_LEN: usize = 48;

/// Number of leading status message bytes covered by its checksum.
pub const STATUS_CHECKSUM_SPAN: usize = 44;

/// Characters per display line.
pub const LINE_LEN: usize = 16;

/// Capacity of the host command line buffer.
pub const HOST_LINE_LEN: usize = 128;

/// Capacity of one host listing line.
pub const LISTING_LEN: usize = 128;
