//! 7-bit group unpacking
//!
//! The transport only carries 7 usable bits per byte. Dense data is sent in
//! groups of up to 8 bytes: a lead byte whose low bits hold the high bit of
//! each of the following (up to 7) data bytes.

use std::borrow::Cow;

/// Maximum group length: one lead byte plus seven data bytes
const GROUP_LEN: usize = 8;

/// Decode a group-packed payload into dense bytes.
///
/// A payload with any high bit set cannot be group-packed, so it is returned
/// unchanged. Trailing groups shorter than two bytes carry no data and are
/// dropped.
pub fn unpack_7bit(core: &[u8]) -> Cow<'_, [u8]> {
    if core.iter().any(|&b| b & 0x80 != 0) {
        return Cow::Borrowed(core);
    }

    let mut out = Vec::with_capacity(core.len());
    for group in core.chunks(GROUP_LEN) {
        if group.len() < 2 {
            break;
        }
        let lead = group[0];
        for (k, &b) in group[1..].iter().enumerate() {
            out.push(b | (((lead >> k) & 1) << 7));
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpacks_high_bits_from_lead_byte() {
        // Lead 0b0000101 restores the high bit of data bytes 0 and 2
        let packed = [0x05, 0x01, 0x02, 0x03];
        assert_eq!(unpack_7bit(&packed).as_ref(), &[0x81, 0x02, 0x83]);
    }

    #[test]
    fn test_full_groups() {
        let mut packed = vec![0x7F];
        packed.extend_from_slice(&[0x00; 7]);
        packed.push(0x00);
        packed.extend_from_slice(&[0x11, 0x22]);

        let out = unpack_7bit(&packed);
        assert_eq!(out.len(), 9);
        assert!(out[..7].iter().all(|&b| b == 0x80));
        assert_eq!(&out[7..], &[0x11, 0x22]);
    }

    #[test]
    fn test_dense_payload_is_returned_unchanged() {
        let dense = [0x10, 0x90, 0x20];
        let out = unpack_7bit(&dense);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out.as_ref(), &dense);
    }

    #[test]
    fn test_short_trailing_group_is_dropped() {
        let mut packed = vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        packed.push(0x01);
        assert_eq!(unpack_7bit(&packed).len(), 7);
    }

    #[test]
    fn test_output_never_longer_than_input() {
        for len in 0..40usize {
            let input: Vec<u8> = (0..len).map(|i| (i as u8) & 0x7F).collect();
            assert!(unpack_7bit(&input).len() <= input.len());
        }
    }
}
