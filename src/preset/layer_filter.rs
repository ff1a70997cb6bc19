//! Layer filter parameter record (14 bytes)

use serde::Serialize;

use crate::error::{Result, ZpackError};

/// Size of one layer filter record
pub const LAYER_FILTER_LEN: usize = 14;

/// Size of one layer envelope record
pub const LAYER_ENVELOPE_LEN: usize = 92;

/// Filter parameters of one layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerFilter {
    pub filter_type: u8,
    pub cutoff: u8,
    pub q: u8,
    pub morph_index: u8,
    pub morph_depth: u8,
    pub tilt: i8,
    pub reserved: [u8; 8],
}

impl LayerFilter {
    /// Decode a record of exactly [`LAYER_FILTER_LEN`] bytes.
    ///
    /// `id` is only used to label the error.
    pub fn decode(id: u32, data: &[u8]) -> Result<Self> {
        let bytes: &[u8; LAYER_FILTER_LEN] =
            data.try_into().map_err(|_| ZpackError::WrongLength {
                id,
                expected: LAYER_FILTER_LEN,
                actual: data.len(),
            })?;

        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&bytes[6..]);
        Ok(Self {
            filter_type: bytes[0],
            cutoff: bytes[1],
            q: bytes[2],
            morph_index: bytes[3],
            morph_depth: bytes[4],
            tilt: bytes[5] as i8,
            reserved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_layer_filter() {
        let data = [2, 100, 40, 3, 64, 0xF6, 1, 2, 3, 4, 5, 6, 7, 8];
        let f = LayerFilter::decode(0, &data).unwrap();

        assert_eq!(f.filter_type, 2);
        assert_eq!(f.cutoff, 100);
        assert_eq!(f.q, 40);
        assert_eq!(f.morph_index, 3);
        assert_eq!(f.morph_depth, 64);
        assert_eq!(f.tilt, -10);
        assert_eq!(f.reserved, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let err = LayerFilter::decode(9, &[0u8; 13]).unwrap_err();
        match err {
            ZpackError::WrongLength {
                id,
                expected,
                actual,
            } => {
                assert_eq!(id, 9);
                assert_eq!(expected, 14);
                assert_eq!(actual, 13);
            }
            other => panic!("Expected WrongLength error, got: {:?}", other),
        }
        assert!(LayerFilter::decode(0, &[0u8; 15]).is_err());
    }
}
