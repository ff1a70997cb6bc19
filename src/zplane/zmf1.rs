//! ZMF1 coefficient blob
//!
//! Layout (little-endian):
//! ```text
//! 0   magic "ZMF1"     4 bytes
//! 4   version          u16 (=1)
//! 6   model id         u16
//! 8   frame count      u8  (1..=64)
//! 9   section count    u8  (1..=6)
//! 10  sample rate ref  u32
//! 14  reserved         u16
//! 16  frame-major (b0, b1, b2, a1, a2) f32 quintuples
//! ```

use crate::error::{Result, ZpackError};

use super::coeffs::BiquadCoeffs;

pub const MAGIC: &[u8; 4] = b"ZMF1";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 16;
pub const MAX_FRAMES: usize = 64;
pub const MAX_SECTIONS: usize = 6;

/// Reference sample rate the pole angles are defined against
pub const SAMPLE_RATE_REF: u32 = 48_000;

const SECTION_BYTES: usize = 5 * 4;

/// Precomputed morph table of biquad cascades
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientBlob {
    pub model_id: u16,
    pub sample_rate_ref: u32,
    frame_count: usize,
    section_count: usize,
    /// Frame-major, `frame_count * section_count` entries
    coeffs: Vec<BiquadCoeffs>,
}

fn malformed(reason: String) -> ZpackError {
    ZpackError::MalformedCoefficientBlob { reason }
}

impl CoefficientBlob {
    /// Build a blob from frames of equal section count
    pub fn from_frames(model_id: u16, frames: Vec<Vec<BiquadCoeffs>>) -> Result<Self> {
        let frame_count = frames.len();
        let section_count = frames.first().map_or(0, Vec::len);
        if frame_count == 0 || frame_count > MAX_FRAMES {
            return Err(ZpackError::InvalidFrameCount { count: frame_count });
        }
        if section_count == 0 || section_count > MAX_SECTIONS {
            return Err(malformed(format!("section count {} outside 1..=6", section_count)));
        }
        if frames.iter().any(|f| f.len() != section_count) {
            return Err(malformed("frames have differing section counts".to_string()));
        }

        Ok(Self {
            model_id,
            sample_rate_ref: SAMPLE_RATE_REF,
            frame_count,
            section_count,
            coeffs: frames.into_iter().flatten().collect(),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn section_count(&self) -> usize {
        self.section_count
    }

    /// Sections of one frame
    pub fn frame(&self, index: usize) -> Option<&[BiquadCoeffs]> {
        let start = index.checked_mul(self.section_count)?;
        self.coeffs.get(start..start + self.section_count)
    }

    /// All sections of all frames, frame-major
    pub fn sections(&self) -> &[BiquadCoeffs] {
        &self.coeffs
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.coeffs.len() * SECTION_BYTES
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&self.model_id.to_le_bytes());
        out.push(self.frame_count as u8);
        out.push(self.section_count as u8);
        out.extend_from_slice(&self.sample_rate_ref.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());

        for c in &self.coeffs {
            for v in c.to_array() {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        out
    }

    /// Decode and validate a blob. Bytes past the announced table are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(malformed(format!("{} bytes is shorter than the header", bytes.len())));
        }
        if &bytes[0..4] != MAGIC {
            return Err(malformed(format!("bad magic {:02X?}", &bytes[0..4])));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(malformed(format!("unsupported version {}", version)));
        }

        let model_id = u16::from_le_bytes([bytes[6], bytes[7]]);
        let frame_count = usize::from(bytes[8]);
        let section_count = usize::from(bytes[9]);
        let sample_rate_ref = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]);

        if frame_count == 0 || frame_count > MAX_FRAMES {
            return Err(malformed(format!("frame count {} outside 1..=64", frame_count)));
        }
        if section_count == 0 || section_count > MAX_SECTIONS {
            return Err(malformed(format!("section count {} outside 1..=6", section_count)));
        }
        let expected = HEADER_LEN + frame_count * section_count * SECTION_BYTES;
        if bytes.len() < expected {
            return Err(malformed(format!(
                "{} bytes, header announces {}",
                bytes.len(),
                expected
            )));
        }

        let coeffs = bytes[HEADER_LEN..expected]
            .chunks_exact(SECTION_BYTES)
            .map(|chunk| {
                let mut v = [0f32; 5];
                for (slot, raw) in v.iter_mut().zip(chunk.chunks_exact(4)) {
                    *slot = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
                }
                BiquadCoeffs::from_array(v)
            })
            .collect();

        Ok(Self {
            model_id,
            sample_rate_ref,
            frame_count,
            section_count,
            coeffs,
        })
    }

    /// Cascade at a morph position in [0, 1], blending neighbouring frames
    pub fn coefficients_at(&self, morph: f32) -> Vec<BiquadCoeffs> {
        let last = self.frame_count - 1;
        if last == 0 {
            return self.coeffs.clone();
        }

        let pos = morph.clamp(0.0, 1.0) * last as f32;
        let i0 = (pos as usize).min(last);
        let i1 = (i0 + 1).min(last);
        let t = pos - i0 as f32;

        let a = &self.coeffs[i0 * self.section_count..(i0 + 1) * self.section_count];
        let b = &self.coeffs[i1 * self.section_count..(i1 + 1) * self.section_count];
        a.iter().zip(b).map(|(x, y)| x.lerp(y, t)).collect()
    }

    /// Share of sections inside the stability triangle
    pub fn stability_ratio(&self) -> f32 {
        if self.coeffs.is_empty() {
            return 0.0;
        }
        let stable = self.coeffs.iter().filter(|c| c.is_stable()).count();
        stable as f32 / self.coeffs.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(v: f32) -> BiquadCoeffs {
        BiquadCoeffs::from_array([v, 0.0, -v, -0.5, 0.25])
    }

    fn two_frame_blob() -> CoefficientBlob {
        CoefficientBlob::from_frames(
            2,
            vec![vec![section(0.0), section(0.1)], vec![section(1.0), section(1.1)]],
        )
        .unwrap()
    }

    #[test]
    fn test_header_layout() {
        let bytes = two_frame_blob().encode();

        assert_eq!(bytes.len(), 16 + 4 * 20);
        assert_eq!(&bytes[0..4], b"ZMF1");
        assert_eq!(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 0x3146_4D5A);
        assert_eq!(&bytes[4..6], &[1, 0]);
        assert_eq!(&bytes[6..8], &[2, 0]);
        assert_eq!(bytes[8], 2);
        assert_eq!(bytes[9], 2);
        assert_eq!(&bytes[10..14], &48_000u32.to_le_bytes());
        assert_eq!(&bytes[14..16], &[0, 0]);
        assert_eq!(&bytes[16..20], &0f32.to_le_bytes());
    }

    #[test]
    fn test_decode_matches_encoded_blob() {
        let blob = two_frame_blob();
        let decoded = CoefficientBlob::decode(&blob.encode()).unwrap();
        assert_eq!(decoded, blob);
        assert_eq!(decoded.frame(1).unwrap()[1], section(1.1));
        assert!(decoded.frame(2).is_none());
    }

    #[test]
    fn test_decode_rejects_bad_headers() {
        let good = two_frame_blob().encode();

        let mut bad = good.clone();
        bad[0] = b'X';
        assert!(CoefficientBlob::decode(&bad).is_err());

        let mut bad = good.clone();
        bad[4] = 2;
        assert!(CoefficientBlob::decode(&bad).is_err());

        let mut bad = good.clone();
        bad[8] = 65;
        assert!(CoefficientBlob::decode(&bad).is_err());

        let mut bad = good.clone();
        bad[9] = 7;
        assert!(CoefficientBlob::decode(&bad).is_err());

        let err = CoefficientBlob::decode(&good[..good.len() - 1]).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_COEFFICIENT_BLOB");
        assert!(CoefficientBlob::decode(&good[..10]).is_err());
    }

    #[test]
    fn test_coefficients_at_blends_frames() {
        let blob = two_frame_blob();

        assert_eq!(blob.coefficients_at(0.0), vec![section(0.0), section(0.1)]);
        assert_eq!(blob.coefficients_at(1.0), vec![section(1.0), section(1.1)]);
        assert_eq!(blob.coefficients_at(7.0), vec![section(1.0), section(1.1)]);

        let mid = blob.coefficients_at(0.5);
        assert!((mid[0].b0 - 0.5).abs() < 1e-6);
        assert!((mid[1].b0 - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_from_frames_validates_shape() {
        assert!(CoefficientBlob::from_frames(0, vec![]).is_err());
        assert!(CoefficientBlob::from_frames(0, vec![vec![]]).is_err());
        assert!(CoefficientBlob::from_frames(0, vec![vec![section(0.0)], vec![]]).is_err());
        assert!(CoefficientBlob::from_frames(0, vec![vec![section(0.0)]; 65]).is_err());
    }

    #[test]
    fn test_stability_ratio() {
        let unstable = BiquadCoeffs::from_array([0.0, 0.0, 0.0, 2.5, 0.5]);
        let blob = CoefficientBlob::from_frames(0, vec![vec![section(0.0), unstable]]).unwrap();
        assert!((blob.stability_ratio() - 0.5).abs() < 1e-6);
    }
}
