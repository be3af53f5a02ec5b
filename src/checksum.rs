//! Sum-mod-256 frame checksum.
//!
//! Both frame directions close with a single checksum byte equal to the
//! arithmetic sum of every other byte, truncated to eight bits.

/// Sums every byte in `buffer` and returns the total modulo 256.
///
/// Callers pass the frame *without* its trailing checksum byte, or a frame whose
/// checksum position has been zeroed. Any byte sequence is accepted, including
/// an empty one (which yields `0`).
pub fn compute(buffer: &[u8]) -> u8 {
    buffer.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// Returns `true` if the last byte of `frame` is the checksum of the bytes before it.
///
/// An empty slice has no checksum byte and never matches.
pub fn matches(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((last, body)) => compute(body) == *last,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_sums_to_zero() {
        assert_eq!(compute(&[]), 0);
    }

    #[test]
    fn test_sum_wraps_at_256() {
        assert_eq!(compute(&[0xff, 0x01]), 0x00);
        assert_eq!(compute(&[0xc3, 0xa5]), 0x68);
        assert_eq!(compute(&[0x80; 5]), 0x80);
    }

    #[test]
    fn test_matches_checks_trailing_byte() {
        assert!(matches(&[0x5a, 0x3c, 0x96]));
        assert!(!matches(&[0x5a, 0x3c, 0x97]));
        assert!(!matches(&[]));
        assert!(matches(&[0x00]));
    }
}
