//! ZPK1 Packs
//!
//! Writing and reading the ZPK1 container, its JSON sidecar, and the
//! read-only index and query tools built on top of the reader.

pub mod container;
pub mod index;
pub mod sidecar;

pub use container::{pack, Container, Entry, ENTRY_LEN, HEADER_LEN};
pub use index::{EntryFilter, PackIndex, PresetInspection};
pub use sidecar::Sidecar;
