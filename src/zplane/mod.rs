//! Z-Plane Coefficient Synthesis
//!
//! A pole model describes two six-section filter shapes (frame A and frame
//! B). Morphing between them is precomputed into a table of biquad
//! coefficients and serialized as a ZMF1 blob.

pub mod coeffs;
pub mod model;
pub mod synth;
pub mod zmf1;

pub use coeffs::{interpolate_pole, BiquadCoeffs};
pub use model::{ModelTable, Pole, PoleModel, SECTION_COUNT};
pub use synth::{synthesize, CoefficientSynthesizer, DEFAULT_FRAME_COUNT};
pub use zmf1::CoefficientBlob;
