//! Sum-to-zero checksums used by keypad frames and status messages.

/// Wrapping byte sum of `bytes`.
pub(crate) fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Checksum that makes `sum(bytes) + checksum == 0 (mod 256)`.
///
/// This is `0x100 - sum` truncated to a byte.
pub(crate) fn complement(bytes: &[u8]) -> u8 {
    0u8.wrapping_sub(sum(bytes))
}
