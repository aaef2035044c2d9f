//! The `F7` status display message.
//!
//! Layout (48 bytes):
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0 | message type (`0xF7`) |
//! | 1 | destination mask |
//! | 2 | target address |
//! | 3 | keypads (`0xFF` for all) |
//! | 4 | reserved (`0x10`) |
//! | 5 | zone |
//! | 6 | tone |
//! | 7 | flags: ready `0x10`, armed-stay `0x80` |
//! | 8 | flags: chime `0x20`, power `0x08`, armed-away `0x04` |
//! | 9 | program |
//! | 10 | prompt |
//! | 11 | pad |
//! | 12..28 | display line 1 |
//! | 28..44 | display line 2 |
//! | 44 | checksum |
//! | 45..48 | reserved |
//!
//! Display characters are 7-bit; bit 7 of line 1's first byte switches the
//! backlight.

use core::fmt;

use crate::checksum;
use crate::consts::{LINE_LEN, NO_KEYPADS, STATUS_CHECKSUM_SPAN, STATUS_MSG_LEN, STATUS_OPCODE};

const TYPE: usize = 0;
const DEST_MASK: usize = 1;
const TARGET_ADDR: usize = 2;
const KEYPADS: usize = 3;
const RESERVED: usize = 4;
const ZONE: usize = 5;
const TONE: usize = 6;
const FLAGS_A: usize = 7;
const FLAGS_B: usize = 8;
const PROGRAM: usize = 9;
const PROMPT: usize = 10;
const PAD: usize = 11;
const LINE1: usize = 12;
const LINE2: usize = LINE1 + LINE_LEN;
const CHECKSUM: usize = STATUS_CHECKSUM_SPAN;

const BACKLIGHT_BIT: u8 = 0x80;
const CHAR_MASK: u8 = 0x7F;

/// One display line, 16 characters.
pub type DisplayLine = [u8; LINE_LEN];

/// Indicator bits carried in the two flag bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFlag {
    /// System ready to arm.
    Ready,
    /// Armed, stay mode.
    ArmedStay,
    /// Armed, away mode.
    ArmedAway,
    /// Door chime enabled.
    Chime,
    /// Mains power present.
    Power,
}

impl StatusFlag {
    /// Every flag, in command order.
    pub const ALL: [StatusFlag; 5] = [
        StatusFlag::Chime,
        StatusFlag::Ready,
        StatusFlag::ArmedAway,
        StatusFlag::ArmedStay,
        StatusFlag::Power,
    ];

    const fn location(self) -> (usize, u8) {
        match self {
            StatusFlag::Ready => (FLAGS_A, 0x10),
            StatusFlag::ArmedStay => (FLAGS_A, 0x80),
            StatusFlag::ArmedAway => (FLAGS_B, 0x04),
            StatusFlag::Chime => (FLAGS_B, 0x20),
            StatusFlag::Power => (FLAGS_B, 0x08),
        }
    }
}

/// Mutable, field-by-field form of a [`StatusMessage`].
///
/// Nothing is sent from a draft; [`StatusDraft::finalize`] masks the display
/// lines, folds in the backlight bit and computes the checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDraft {
    /// Message type byte.
    pub msg_type: u8,
    /// Destination mask byte.
    pub dest_mask: u8,
    /// Target address byte.
    pub target_addr: u8,
    /// Keypads the message is meant for.
    pub keypads: u8,
    /// Reserved byte 4.
    pub reserved: u8,
    /// Zone number shown on the display.
    pub zone: u8,
    /// Tone: low two bits are the chime count, 4 fast pulse, 5..6 slow
    /// pulse, 7 continuous.
    pub tone: u8,
    /// Raw first flag byte.
    pub flags_a: u8,
    /// Raw second flag byte.
    pub flags_b: u8,
    /// Program byte.
    pub program: u8,
    /// Prompt byte.
    pub prompt: u8,
    /// Pad byte.
    pub pad: u8,
    /// First display line.
    pub line1: DisplayLine,
    /// Second display line.
    pub line2: DisplayLine,
    /// Display backlight.
    pub backlight: bool,
}

impl Default for StatusDraft {
    fn default() -> Self {
        Self {
            msg_type: STATUS_OPCODE,
            dest_mask: 0,
            target_addr: 0,
            keypads: NO_KEYPADS,
            reserved: 0x10,
            zone: 0,
            tone: 0,
            flags_a: 0,
            flags_b: 0,
            program: 0x02,
            prompt: 0,
            pad: 0,
            line1: [b' '; LINE_LEN],
            line2: [b' '; LINE_LEN],
            backlight: false,
        }
    }
}

impl StatusDraft {
    /// Reads one indicator.
    pub fn flag(&self, flag: StatusFlag) -> bool {
        let (index, mask) = flag.location();
        self.flag_byte(index) & mask != 0
    }

    /// Sets or clears one indicator, leaving the other bits of its byte.
    pub fn set_flag(&mut self, flag: StatusFlag, on: bool) {
        let (index, mask) = flag.location();
        let byte = if index == FLAGS_A {
            &mut self.flags_a
        } else {
            &mut self.flags_b
        };
        if on {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    fn flag_byte(&self, index: usize) -> u8 {
        if index == FLAGS_A {
            self.flags_a
        } else {
            self.flags_b
        }
    }

    /// Produces the wire message.
    pub fn finalize(&self) -> StatusMessage {
        let mut bytes = [0u8; STATUS_MSG_LEN];
        bytes[TYPE] = self.msg_type;
        bytes[DEST_MASK] = self.dest_mask;
        bytes[TARGET_ADDR] = self.target_addr;
        bytes[KEYPADS] = self.keypads;
        bytes[RESERVED] = self.reserved;
        bytes[ZONE] = self.zone;
        bytes[TONE] = self.tone;
        bytes[FLAGS_A] = self.flags_a;
        bytes[FLAGS_B] = self.flags_b;
        bytes[PROGRAM] = self.program;
        bytes[PROMPT] = self.prompt;
        bytes[PAD] = self.pad;
        for (dst, src) in bytes[LINE1..LINE2].iter_mut().zip(self.line1) {
            *dst = src & CHAR_MASK;
        }
        for (dst, src) in bytes[LINE2..CHECKSUM].iter_mut().zip(self.line2) {
            *dst = src & CHAR_MASK;
        }
        if self.backlight {
            bytes[LINE1] |= BACKLIGHT_BIT;
        }
        bytes[CHECKSUM] = checksum::complement(&bytes[..STATUS_CHECKSUM_SPAN]);
        StatusMessage { bytes }
    }
}

/// A finalized status display message, ready to send.
///
/// The checksum always matches the first 44 bytes; the only way to change a
/// message is to go through [`StatusMessage::to_draft`] and finalize again.
#[derive(Clone, PartialEq, Eq)]
pub struct StatusMessage {
    bytes: [u8; STATUS_MSG_LEN],
}

impl Default for StatusMessage {
    fn default() -> Self {
        StatusDraft::default().finalize()
    }
}

impl StatusMessage {
    /// Wraps raw bytes, e.g. a message captured from a panel.
    ///
    /// The bytes are kept exactly; check [`StatusMessage::checksum_ok`]
    /// before trusting them.
    pub fn from_bytes(bytes: [u8; STATUS_MSG_LEN]) -> Self {
        Self { bytes }
    }

    /// The 48 bytes sent on the bus.
    pub fn as_bytes(&self) -> &[u8; STATUS_MSG_LEN] {
        &self.bytes
    }

    /// Whether the checksum byte matches the message.
    pub fn checksum_ok(&self) -> bool {
        checksum::complement(&self.bytes[..STATUS_CHECKSUM_SPAN]) == self.bytes[CHECKSUM]
    }

    /// Editable copy of the message.
    pub fn to_draft(&self) -> StatusDraft {
        StatusDraft {
            msg_type: self.bytes[TYPE],
            dest_mask: self.bytes[DEST_MASK],
            target_addr: self.bytes[TARGET_ADDR],
            keypads: self.bytes[KEYPADS],
            reserved: self.bytes[RESERVED],
            zone: self.bytes[ZONE],
            tone: self.bytes[TONE],
            flags_a: self.bytes[FLAGS_A],
            flags_b: self.bytes[FLAGS_B],
            program: self.bytes[PROGRAM],
            prompt: self.bytes[PROMPT],
            pad: self.bytes[PAD],
            line1: self.line1(),
            line2: self.line2(),
            backlight: self.backlight(),
        }
    }

    /// Message type byte.
    pub fn msg_type(&self) -> u8 {
        self.bytes[TYPE]
    }

    /// Keypads the message is meant for.
    pub fn keypads(&self) -> u8 {
        self.bytes[KEYPADS]
    }

    /// Zone number.
    pub fn zone(&self) -> u8 {
        self.bytes[ZONE]
    }

    /// Tone byte.
    pub fn tone(&self) -> u8 {
        self.bytes[TONE]
    }

    /// Reads one indicator.
    pub fn flag(&self, flag: StatusFlag) -> bool {
        let (index, mask) = flag.location();
        self.bytes[index] & mask != 0
    }

    /// Display backlight.
    pub fn backlight(&self) -> bool {
        self.bytes[LINE1] & BACKLIGHT_BIT != 0
    }

    /// First display line, 7-bit characters.
    pub fn line1(&self) -> DisplayLine {
        display_line(&self.bytes[LINE1..LINE2])
    }

    /// Second display line, 7-bit characters.
    pub fn line2(&self) -> DisplayLine {
        display_line(&self.bytes[LINE2..CHECKSUM])
    }

    /// Checksum byte.
    pub fn checksum(&self) -> u8 {
        self.bytes[CHECKSUM]
    }
}

fn display_line(raw: &[u8]) -> DisplayLine {
    let mut line = [0u8; LINE_LEN];
    for (dst, src) in line.iter_mut().zip(raw) {
        *dst = src & CHAR_MASK;
    }
    line
}

fn write_line(f: &mut fmt::Formatter<'_>, name: &str, line: &DisplayLine) -> fmt::Result {
    write!(f, "  {}='", name)?;
    for &c in line {
        fmt::Write::write_char(f, char::from(c))?;
    }
    writeln!(f, "'")
}

fn bit(on: bool) -> char {
    if on { '1' } else { '0' }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:02x} msg -> kp[{:02x}]",
            self.msg_type(),
            self.keypads()
        )?;
        writeln!(
            f,
            "  zone={:02x}, tone={:x}, chime={}, power={}",
            self.zone(),
            self.tone(),
            bit(self.flag(StatusFlag::Chime)),
            bit(self.flag(StatusFlag::Power)),
        )?;
        writeln!(
            f,
            "  ready={}, armed-away={}, armed-stay={}",
            bit(self.flag(StatusFlag::Ready)),
            bit(self.flag(StatusFlag::ArmedAway)),
            bit(self.flag(StatusFlag::ArmedStay)),
        )?;
        write_line(f, "line1", &self.line1())?;
        write_line(f, "line2", &self.line2())?;
        writeln!(f, "checksum {:02x}", self.checksum())
    }
}

impl fmt::Debug for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusMessage")
            .field("zone", &self.zone())
            .field("tone", &self.tone())
            .field("backlight", &self.backlight())
            .field("checksum", &self.checksum())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "defmt-0-3")]
impl defmt::Format for StatusMessage {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(
            f,
            "StatusMessage zone={=u8:#x} tone={=u8} checksum={=u8:#x}",
            self.zone(),
            self.tone(),
            self.checksum()
        );
    }
}
