//! Preset header decoding

use serde::Serialize;

use super::layer_filter::{LAYER_ENVELOPE_LEN, LAYER_FILTER_LEN};
use crate::error::{Result, ZpackError};

/// Smallest decodable header: subtype, preset number, byte count, ten counts
pub const HEADER_MIN_LEN: usize = 1 + 2 + 4 + 10;

/// Parameter counts announced by a preset header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetCounts {
    pub general: u8,
    pub reserved: u8,
    pub effects: u8,
    pub links: u8,
    pub layers: u8,
    pub layer_general: u8,
    pub layer_filter: u8,
    pub layer_lfo: u8,
    pub layer_envelope: u8,
    pub layer_cords: u8,
}

impl PresetCounts {
    fn from_bytes(b: &[u8; 10]) -> Self {
        Self {
            general: b[0],
            reserved: b[1],
            effects: b[2],
            links: b[3],
            layers: b[4],
            layer_general: b[5],
            layer_filter: b[6],
            layer_lfo: b[7],
            layer_envelope: b[8],
            layer_cords: b[9],
        }
    }
}

/// Decoded view of a preset header record's data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetHeader {
    pub subtype: u8,
    /// 14-bit preset number (LSB, MSB as 7-bit bytes)
    pub preset_number: u16,
    /// Total preset data size announced by the device
    pub data_byte_count: u32,
    pub counts: PresetCounts,
}

impl PresetHeader {
    /// Decode a header from record data starting with the subtype byte
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_MIN_LEN {
            return Err(ZpackError::HeaderTooShort {
                len: data.len(),
                min: HEADER_MIN_LEN,
            });
        }

        let preset_number = u16::from(data[1] & 0x7F) | (u16::from(data[2] & 0x7F) << 7);
        let data_byte_count = u32::from_le_bytes([data[3], data[4], data[5], data[6]]);
        let mut counts = [0u8; 10];
        counts.copy_from_slice(&data[7..17]);

        Ok(Self {
            subtype: data[0],
            preset_number,
            data_byte_count,
            counts: PresetCounts::from_bytes(&counts),
        })
    }

    /// Size of the layer filter and layer envelope records at the end of the
    /// assembled preset data
    pub fn carve_need(&self) -> usize {
        usize::from(self.counts.layer_filter) * LAYER_FILTER_LEN
            + usize::from(self.counts.layer_envelope) * LAYER_ENVELOPE_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_header() {
        let data = [
            0x01, 0x05, 0x02, 0x10, 0x02, 0x00, 0x00, // sub, preset, byte count
            1, 0, 2, 3, 4, 5, 6, 7, 8, 9, // counts
            0x33, // trailing checksum is ignored
        ];
        let hdr = PresetHeader::decode(&data).unwrap();

        assert_eq!(hdr.subtype, 0x01);
        assert_eq!(hdr.preset_number, 5 | (2 << 7));
        assert_eq!(hdr.data_byte_count, 0x0210);
        assert_eq!(hdr.counts.general, 1);
        assert_eq!(hdr.counts.layers, 4);
        assert_eq!(hdr.counts.layer_filter, 6);
        assert_eq!(hdr.counts.layer_envelope, 8);
        assert_eq!(hdr.counts.layer_cords, 9);
        assert_eq!(hdr.carve_need(), 6 * 14 + 8 * 92);
    }

    #[test]
    fn test_short_header_fails() {
        let err = PresetHeader::decode(&[0x01; 16]).unwrap_err();
        assert!(matches!(err, ZpackError::HeaderTooShort { len: 16, min: 17 }));
        assert!(PresetHeader::decode(&[0x01; 17]).is_ok());
    }

    #[test]
    fn test_header_serializes_camel_case() {
        let hdr = PresetHeader::decode(&[0u8; 17]).unwrap();
        let json = serde_json::to_value(hdr).unwrap();
        assert!(json.get("presetNumber").is_some());
        assert!(json["counts"].get("layerFilter").is_some());
    }
}
