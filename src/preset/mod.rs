//! Preset Reassembly
//!
//! Preset dumps arrive as a header message plus sequence-numbered
//! continuation packets. This module merges the packets into one blob and
//! recovers layer filter records from it using the header's counts.

pub mod assembler;
pub mod header;
pub mod layer_filter;
pub mod segment;

pub use assembler::{AssemblyPolicy, DuplicatePolicy, GapPolicy, PresetAssembler};
pub use header::{PresetCounts, PresetHeader};
pub use layer_filter::LayerFilter;
pub use segment::{segment_layer_filters, SegmentOutcome};
