//! SysEx Decoding
//!
//! Turns a raw `.syx` capture into canonical messages:
//! frame extraction, optional 7-bit group unpacking, and matching against a
//! device specification.

pub mod canonical;
pub mod device;
pub mod frame;
pub mod unpack;

pub use canonical::{canonicalize, CanonicalMessage, ChecksumStatus};
pub use device::{ChecksumKind, DeviceSpec};
pub use frame::{frames, Frame, Frames, SYSEX_END, SYSEX_START};
pub use unpack::unpack_7bit;
