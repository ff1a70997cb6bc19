//! zpack - SysEx dump decoding and ZPK1 pack building
//!
//! Turns raw System-Exclusive captures of ROM sound module presets into a
//! compact, randomly seekable container:
//!
//! 1. [`sysex`]: frame extraction, 7-bit unpacking, device matching
//! 2. [`preset`]: continuation packet reassembly and header-driven carving
//!    of layer filter records
//! 3. [`zplane`]: optional pole-model coefficient tables (ZMF1)
//! 4. [`pack`]: the ZPK1 container, its JSON sidecar, and read-only tools
//!
//! [`pipeline`] runs the stages for one file and [`batch`] for a directory.

pub mod batch;
pub mod cli;
pub mod error;
pub mod pack;
pub mod pipeline;
pub mod preset;
pub mod record;
pub mod scan;
pub mod sysex;
pub mod zplane;

pub use error::{Result, ZpackError};
