//! Keypad response frames.
//!
//! A keypad answers a data request with a frame whose length is decided by
//! its first two bytes: the echoed address and a type-or-length byte.
//! [`FrameKind::classify`] makes that decision up front so the reader never
//! branches on raw bytes mid-read.

use heapless::Vec;

use crate::checksum;
use crate::consts::{
    ADDRESS_MASK, FRAME_BUF_LEN, MAX_KEYS_BODY_LEN, POWER_UP_FRAME_LEN, POWER_UP_OPCODE,
};

/// Bytes of a keypad frame as read off the bus, checksum included.
pub type RawFrame = Vec<u8, FRAME_BUF_LEN>;

/// Length of the address and type-or-length header.
pub const HEADER_LEN: usize = 2;

/// The shape of a keypad frame, decided from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Sent once by a keypad after it powers up. Always nine bytes.
    PowerUp,
    /// Key presses: `body_len` bytes follow the header, the last being the
    /// checksum.
    Keys {
        /// The header's length byte.
        body_len: u8,
    },
    /// Anything else. Read until the buffer fills or the line goes quiet.
    Unknown {
        /// The header's type byte.
        msg_type: u8,
    },
}

impl FrameKind {
    /// Classifies a frame from its two header bytes.
    pub fn classify(header: [u8; HEADER_LEN]) -> Self {
        match header[1] {
            POWER_UP_OPCODE => FrameKind::PowerUp,
            len if len <= MAX_KEYS_BODY_LEN => FrameKind::Keys { body_len: len },
            msg_type => FrameKind::Unknown { msg_type },
        }
    }

    /// Total frame length including the header, or `None` when the frame
    /// has no declared length.
    pub fn total_len(self) -> Option<usize> {
        match self {
            FrameKind::PowerUp => Some(POWER_UP_FRAME_LEN),
            FrameKind::Keys { body_len } => Some(usize::from(body_len) + HEADER_LEN),
            FrameKind::Unknown { .. } => None,
        }
    }

    /// Whether the frame carries key presses.
    pub fn is_keys(self) -> bool {
        matches!(self, FrameKind::Keys { .. })
    }
}

/// Keypad address echoed in a frame's first byte.
pub fn frame_address(frame: &[u8]) -> Option<u8> {
    frame.first().map(|byte| byte & ADDRESS_MASK)
}

/// Checks a frame's trailing checksum.
///
/// Returns `(computed, carried)` on mismatch. The checksum is the two's
/// complement of the sum of every preceding byte, so a valid frame sums to
/// zero.
pub fn verify_checksum(frame: &[u8]) -> Result<(), (u8, u8)> {
    let Some((&carried, body)) = frame.split_last() else {
        return Err((0, 0));
    };
    let computed = checksum::complement(body);
    if computed == carried {
        Ok(())
    } else {
        Err((computed, carried))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use super::*;

    #[test]
    fn test_classify_power_up() {
        let kind = FrameKind::classify([0x50, 0x87]);
        assert_eq!(kind, FrameKind::PowerUp);
        assert_eq!(kind.total_len(), Some(9));
    }

    #[test]
    fn test_classify_keys() {
        let kind = FrameKind::classify([0x50, 0x03]);
        assert_eq!(kind, FrameKind::Keys { body_len: 3 });
        assert_eq!(kind.total_len(), Some(5));
        assert!(kind.is_keys());

        assert_eq!(FrameKind::classify([0x50, 16]).total_len(), Some(18));
        assert_eq!(FrameKind::classify([0x50, 0]).total_len(), Some(2));
    }

    #[test]
    fn test_classify_unknown() {
        let kind = FrameKind::classify([0x50, 17]);
        assert_eq!(kind, FrameKind::Unknown { msg_type: 17 });
        assert_eq!(kind.total_len(), None);
        assert!(!kind.is_keys());
    }

    #[test]
    fn test_frame_address_masks_high_bits() {
        assert_eq!(frame_address(&[0x50]), Some(16));
        assert_eq!(frame_address(&[0xD1]), Some(17));
        assert_eq!(frame_address(&[]), None);
    }

    #[test]
    fn test_verify_checksum() {
        assert_eq!(verify_checksum(&[0x50, 0x03, 0x01, 0x02, 0xAA]), Ok(()));
        assert_eq!(
            verify_checksum(&[0x50, 0x03, 0x01, 0x02, 0xAB]),
            Err((0xAA, 0xAB))
        );
    }

    proptest! {
        #[test]
        fn prop_classification_depends_only_on_header(addr in any::<u8>(), second in any::<u8>()) {
            let kind = FrameKind::classify([addr, second]);
            prop_assert_eq!(kind, FrameKind::classify([addr ^ 0xFF, second]));
            match kind {
                FrameKind::PowerUp => prop_assert_eq!(second, 0x87),
                FrameKind::Keys { body_len } => {
                    prop_assert!(second <= 16);
                    prop_assert_eq!(kind.total_len(), Some(usize::from(body_len) + 2));
                }
                FrameKind::Unknown { msg_type } => {
                    prop_assert!(second > 16 && second != 0x87);
                    prop_assert_eq!(msg_type, second);
                }
            }
        }

        #[test]
        fn prop_appended_complement_verifies(
            body in proptest::collection::vec(any::<u8>(), 1..40),
        ) {
            let mut frame = body.clone();
            frame.push(checksum::complement(&body));
            prop_assert_eq!(verify_checksum(&frame), Ok(()));
            prop_assert_eq!(checksum::sum(&frame), 0);
        }
    }
}
