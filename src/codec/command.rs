//! Host command text for status messages.
//!
//! A command is a header followed by space separated `tag=value` fields:
//!
//! ```text
//! F7 z=FC t=0 c=1 r=0 a=1 s=0 p=0 b=1 1=Armed      12:58 2=Welcome Home
//! ```
//!
//! | Tag | Value | Field |
//! |-----|-------|-------|
//! | `z` | 2 hex digits | zone |
//! | `t` | 1 hex digit | tone |
//! | `c` | `0` / `1` | chime |
//! | `r` | `0` / `1` | ready |
//! | `a` | `0` / `1` | armed away |
//! | `s` | `0` / `1` | armed stay |
//! | `p` | `0` / `1` | power |
//! | `b`, `x` | `0` / `1` | backlight |
//! | `1`, `2` | 16 characters | display lines |
//!
//! Every known tag has a fixed width, so line text may contain spaces.
//! Fields not named in a command keep the value they had in the message the
//! command is applied to.

use core::fmt::{self, Write};

use heapless::String;

use crate::consts::{HOST_LINE_LEN, LINE_LEN};
use crate::error::CommandError;

use super::status::{DisplayLine, StatusFlag, StatusMessage};

/// Rendered command text.
pub type CommandText = String<HOST_LINE_LEN>;

/// Which of the two retained status messages a command updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTarget {
    /// `F7`: the primary message. The alternate is replaced as well.
    Primary,
    /// `F7A`: the alternate message only.
    Alternate,
}

impl StatusTarget {
    /// Command header for this target.
    pub fn header(self) -> &'static str {
        match self {
            StatusTarget::Primary => "F7",
            StatusTarget::Alternate => "F7A",
        }
    }
}

/// Splits a command line into its target and field text.
///
/// Returns `None` when the line does not start with a status header.
pub fn split_header(line: &str) -> Option<(StatusTarget, &str)> {
    let line = line.trim_start();
    let (header, fields) = line.split_once(' ').unwrap_or((line, ""));
    let target = match header {
        "F7" => StatusTarget::Primary,
        "F7A" => StatusTarget::Alternate,
        _ => return None,
    };
    Some((target, fields))
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn skip_spaces(&mut self) {
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn next(&mut self) -> Option<u8> {
        let byte = self.bytes.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }

    fn take(&mut self, len: usize, tag: char) -> Result<&'a [u8], CommandError> {
        let end = self.pos + len;
        let value = self
            .bytes
            .get(self.pos..end)
            .ok_or(CommandError::Truncated { tag })?;
        self.pos = end;
        Ok(value)
    }

    fn expect_equals(&mut self, tag: char) -> Result<(), CommandError> {
        match self.next() {
            Some(b'=') => Ok(()),
            Some(_) => Err(CommandError::MissingEquals { tag }),
            None => Err(CommandError::Truncated { tag }),
        }
    }

    fn skip_value(&mut self) {
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|byte| !byte.is_ascii_whitespace())
        {
            self.pos += 1;
        }
    }

    fn hex(&mut self, digits: usize, tag: char) -> Result<u8, CommandError> {
        self.take(digits, tag)?.iter().try_fold(0u8, |acc, &c| {
            let nibble = char::from(c)
                .to_digit(16)
                .ok_or(CommandError::InvalidHex { tag })?;
            // At most two digits.
            Ok((acc << 4) | nibble as u8)
        })
    }

    fn flag(&mut self, tag: char) -> Result<bool, CommandError> {
        match self.take(1, tag)? {
            b"0" => Ok(false),
            b"1" => Ok(true),
            _ => Err(CommandError::InvalidFlag { tag }),
        }
    }

    fn line(&mut self, tag: char) -> Result<DisplayLine, CommandError> {
        let mut line = [0u8; LINE_LEN];
        line.copy_from_slice(self.take(LINE_LEN, tag)?);
        Ok(line)
    }
}

fn flag_for_tag(tag: u8) -> Option<StatusFlag> {
    match tag {
        b'c' => Some(StatusFlag::Chime),
        b'r' => Some(StatusFlag::Ready),
        b'a' => Some(StatusFlag::ArmedAway),
        b's' => Some(StatusFlag::ArmedStay),
        b'p' => Some(StatusFlag::Power),
        _ => None,
    }
}

fn tag_for_flag(flag: StatusFlag) -> char {
    match flag {
        StatusFlag::Chime => 'c',
        StatusFlag::Ready => 'r',
        StatusFlag::ArmedAway => 'a',
        StatusFlag::ArmedStay => 's',
        StatusFlag::Power => 'p',
    }
}

/// Applies the command `fields` (the text after the header) to `base`.
///
/// The first malformed field fails the whole command and `base` is left as
/// it was. Unknown tags are skipped up to the next space.
///
/// The backlight rides on line 1, so it only changes when the command
/// carries `1=`: it is then on only if the command also carries `b=1` (or
/// `x=1`), wherever that appears. Without `1=` the base line 1 is kept as is,
/// backlight bit included.
pub fn decode_command(
    fields: &str,
    base: &StatusMessage,
) -> Result<StatusMessage, CommandError> {
    let mut draft = base.to_draft();
    let mut backlight = false;
    let mut new_line1 = false;
    let mut cursor = Cursor::new(fields);

    loop {
        cursor.skip_spaces();
        let Some(tag) = cursor.next() else {
            break;
        };
        let name = char::from(tag);

        if let Some(flag) = flag_for_tag(tag) {
            cursor.expect_equals(name)?;
            draft.set_flag(flag, cursor.flag(name)?);
            continue;
        }
        match tag {
            b'z' => {
                cursor.expect_equals(name)?;
                draft.zone = cursor.hex(2, name)?;
            }
            b't' => {
                cursor.expect_equals(name)?;
                draft.tone = cursor.hex(1, name)?;
            }
            b'b' | b'x' => {
                cursor.expect_equals(name)?;
                backlight = cursor.flag(name)?;
            }
            b'1' => {
                cursor.expect_equals(name)?;
                draft.line1 = cursor.line(name)?;
                new_line1 = true;
            }
            b'2' => {
                cursor.expect_equals(name)?;
                draft.line2 = cursor.line(name)?;
            }
            _ => {
                trace!("skipping unknown field {}", tag);
                cursor.skip_value();
            }
        }
    }

    if new_line1 {
        draft.backlight = backlight;
    }
    Ok(draft.finalize())
}

fn write_line(out: &mut CommandText, tag: char, line: &DisplayLine) -> fmt::Result {
    write!(out, " {}=", tag)?;
    for &c in line {
        out.write_char(char::from(c))?;
    }
    Ok(())
}

fn render(out: &mut CommandText, msg: &StatusMessage, target: StatusTarget) -> fmt::Result {
    write!(
        out,
        "{} z={:02X} t={:X}",
        target.header(),
        msg.zone(),
        msg.tone() & 0x0F
    )?;
    for flag in StatusFlag::ALL {
        write!(out, " {}={}", tag_for_flag(flag), u8::from(msg.flag(flag)))?;
    }
    write!(out, " b={}", u8::from(msg.backlight()))?;
    write_line(out, '1', &msg.line1())?;
    write_line(out, '2', &msg.line2())
}

/// Renders the command that produces `msg`'s fields.
///
/// Only the fields the grammar can express are rendered; the tone is
/// limited to its low nibble.
pub fn encode_command(msg: &StatusMessage, target: StatusTarget) -> CommandText {
    let mut out = CommandText::new();
    // The longest command is well under the buffer size.
    let _ = render(&mut out, msg, target);
    out
}
