//! Per-file pipeline
//!
//! frames → (unpack) → canonicalize → assemble → segment → (synthesize) → pack

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

use crate::error::{Result, ZpackError};
use crate::pack::{pack, Sidecar};
use crate::preset::{segment_layer_filters, AssemblyPolicy, PresetAssembler, SegmentOutcome};
use crate::record::{Record, RecordSet};
use crate::sysex::{canonicalize, frames, unpack_7bit, DeviceSpec};
use crate::zplane::CoefficientSynthesizer;

/// Pipeline configuration shared by every file of a run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Without a device every frame is packed raw as a type 0 record
    pub device: Option<DeviceSpec>,
    /// Unpack group-packed cores before matching
    pub unpack_7bit: bool,
    pub assembly: AssemblyPolicy,
    /// Coefficient synthesis stage, off when `None`
    pub synthesizer: Option<CoefficientSynthesizer>,
    pub write_sidecar: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            device: None,
            unpack_7bit: false,
            assembly: AssemblyPolicy::default(),
            synthesizer: None,
            write_sidecar: true,
        }
    }
}

/// Counters for one processed input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub frames: usize,
    /// Frames that did not match the device
    pub discarded: usize,
    pub invalid_checksums: usize,
    pub assembled_id: Option<u32>,
    pub layer_filters: usize,
    pub coefficients: usize,
}

/// Record set and counters produced from one input buffer
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub records: RecordSet,
    pub stats: PipelineStats,
    pub segment: Option<SegmentOutcome>,
}

/// Result of packing one file
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub records: usize,
    pub bytes_written: usize,
    /// Sidecar path, if one was written
    pub sidecar: Option<PathBuf>,
    pub stats: PipelineStats,
}

pub struct Pipeline {
    options: PipelineOptions,
    assembler: PresetAssembler,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        let assembler = PresetAssembler::new(options.assembly);
        Self { options, assembler }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn unpack_enabled(&self) -> bool {
        self.options.unpack_7bit || self.options.device.as_ref().is_some_and(|d| d.packed_7bit)
    }

    /// Decode frames into the initial record set; ids are frame ordinals
    fn decode(&self, raw: &[u8], stats: &mut PipelineStats) -> RecordSet {
        let unpack = self.unpack_enabled();
        let mut records = RecordSet::new();

        for (ordinal, frame) in frames(raw).enumerate() {
            stats.frames += 1;
            let id = ordinal as u32;
            let core = if unpack {
                unpack_7bit(frame.core())
            } else {
                frame.core().into()
            };

            let Some(device) = &self.options.device else {
                records.push(Record::raw(id, &core));
                continue;
            };

            match canonicalize(&core, device) {
                Some(msg) => {
                    if !msg.checksum.is_valid() {
                        warn!(
                            "Frame {} at offset {}: checksum mismatch ({:?})",
                            ordinal,
                            frame.offset(),
                            msg.checksum
                        );
                        stats.invalid_checksums += 1;
                    }
                    records.push(Record::canonical(id, msg));
                }
                None => {
                    debug!("Frame {} does not match the device, discarded", ordinal);
                    stats.discarded += 1;
                }
            }
        }
        records
    }

    /// Run every stage over one input buffer
    pub fn run(&self, raw: &[u8]) -> Result<PipelineOutput> {
        let mut stats = PipelineStats::default();
        let mut records = self.decode(raw, &mut stats);

        // Preset stages only apply to canonical records
        let mut segment = None;
        if self.options.device.is_some() {
            stats.assembled_id = self.assembler.assemble(&mut records)?;
            let outcome = segment_layer_filters(&mut records);
            stats.layer_filters = outcome.carved();
            segment = Some(outcome);
        }

        if let Some(synth) = &self.options.synthesizer {
            stats.coefficients = synth.augment(&mut records)?.len();
        }

        Ok(PipelineOutput {
            records,
            stats,
            segment,
        })
    }

    /// Read `input`, run the pipeline and write the container to `output`.
    ///
    /// A sidecar write failure is logged and does not fail the file.
    pub fn process_file(&self, input: &Path, output: &Path) -> Result<FileSummary> {
        if !input.exists() {
            return Err(ZpackError::FileNotFound {
                path: input.to_path_buf(),
            });
        }
        let raw = fs::read(input).map_err(|e| ZpackError::FileReadError {
            path: input.to_path_buf(),
            source: e,
        })?;

        let out = self.run(&raw)?;
        let bytes = pack(out.records.records())?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ZpackError::DirectoryCreateError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(output, &bytes).map_err(|e| ZpackError::FileWriteError {
            path: output.to_path_buf(),
            source: e,
        })?;

        let sidecar = if self.options.write_sidecar {
            let path = Sidecar::path_for(output);
            match Sidecar::from_records(out.records.records()).write(&path) {
                Ok(()) => Some(path),
                Err(e) => {
                    warn!("Failed to write sidecar for {}: {}", output.display(), e);
                    None
                }
            }
        } else {
            None
        };

        info!(
            "Packed {} -> {} ({} bytes, {} records)",
            input.display(),
            output.display(),
            bytes.len(),
            out.records.len()
        );

        Ok(FileSummary {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            records: out.records.len(),
            bytes_written: bytes.len(),
            sidecar,
            stats: out.stats,
        })
    }
}
