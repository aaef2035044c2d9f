//! Host listings of keypad frames.

use core::fmt::Write;

use heapless::String;

use crate::consts::LISTING_LEN;
use crate::frame::FrameKind;

/// One rendered listing line.
pub type Listing = String<LISTING_LEN>;

// Room a byte needs ("0x50 ") plus the closing newline.
const BYTE_ROOM: usize = 6;

/// Renders a received frame for the host, e.g.
/// `KEYS_16[05] 0x50 0x03 0x01 0x02 0xaa\n`.
///
/// Key frames are tagged `KEYS`, everything else `UNK_`, giving e.g.
/// `UNK__23[64] ..`. The bracketed number is the frame length. Bytes that
/// would not fit are left out; the line always ends in `\n`.
pub fn encode_listing(address: u8, kind: FrameKind, bytes: &[u8]) -> Listing {
    let mut out = Listing::new();
    let tag = if kind.is_keys() { "KEYS" } else { "UNK_" };
    let _ = write!(out, "{}_{:2}[{:02}] ", tag, address, bytes.len());
    for byte in bytes {
        if out.capacity() - out.len() <= BYTE_ROOM {
            break;
        }
        let _ = write!(out, "0x{:02x} ", byte);
    }
    let _ = out.pop();
    let _ = out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_listing() {
        let listing = encode_listing(
            16,
            FrameKind::Keys { body_len: 3 },
            &[0x50, 0x03, 0x01, 0x02, 0xAA],
        );
        assert_eq!(listing.as_str(), "KEYS_16[05] 0x50 0x03 0x01 0x02 0xaa\n");
    }

    #[test]
    fn test_unknown_listing_pads_address() {
        let listing = encode_listing(5, FrameKind::PowerUp, &[0x45]);
        assert_eq!(listing.as_str(), "UNK__ 5[01] 0x45\n");
    }

    #[test]
    fn test_empty_listing_still_ends_in_newline() {
        let listing = encode_listing(16, FrameKind::Keys { body_len: 0 }, &[]);
        assert_eq!(listing.as_str(), "KEYS_16[00]\n");
    }

    #[test]
    fn test_long_frame_is_truncated() {
        let bytes = [0x11u8; 64];
        let listing = encode_listing(23, FrameKind::Unknown { msg_type: 0x11 }, &bytes);
        assert!(listing.starts_with("UNK__23[64] 0x11 "));
        assert!(listing.ends_with("0x11\n"));
        assert!(listing.len() <= LISTING_LEN);
        // 12 header characters, then 5 per byte while more than 6 remain.
        assert_eq!(listing.matches("0x11").count(), 22);
    }
}
