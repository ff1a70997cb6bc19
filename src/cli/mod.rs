//! CLI Module
//!
//! Command-line interface for the zpack pack builder and its readers.

pub mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::batch::DEFAULT_GLOB;
use crate::preset::{AssemblyPolicy, DuplicatePolicy, GapPolicy};
use crate::zplane::DEFAULT_FRAME_COUNT;

/// zpack - SysEx dump decoder and ZPK1 pack builder
#[derive(Parser, Debug)]
#[command(name = "zpack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pack one .syx file, or every matching file of a directory
    #[command(name = "pack")]
    Pack(PackArgs),

    /// Index the containers of a directory into JSON
    #[command(name = "index")]
    Index {
        /// Directory to scan
        dir: PathBuf,

        /// Output JSON file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Container file pattern
        #[arg(long, default_value = "**/*.bin")]
        glob: String,
    },

    /// Decode the preset header of one container
    #[command(name = "inspect-preset")]
    InspectPreset {
        /// Container file
        pack: PathBuf,
    },

    /// Collect decoded layer filter entries across a directory
    #[command(name = "layer-filters")]
    LayerFilters {
        /// Directory to scan
        dir: PathBuf,

        /// Output JSON file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Maximum number of entries to collect
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Container file pattern
        #[arg(long, default_value = "**/*.bin")]
        glob: String,
    },

    /// List the entry table of one container
    #[command(name = "entries")]
    Entries {
        /// Container file
        pack: PathBuf,

        /// Only entries of this record type (decimal or 0x-prefixed hex)
        #[arg(long = "type", value_parser = parse_u16)]
        record_type: Option<u16>,

        /// Only entries of this subtype (decimal or 0x-prefixed hex)
        #[arg(long = "sub", value_parser = parse_u16)]
        subtype: Option<u16>,

        /// Print payload bytes as hex
        #[arg(long)]
        hex: bool,
    },

    /// Export every pole model as a ZMF1 file and check its stability
    #[command(name = "models")]
    Models {
        /// Output directory for <name>.zmf1 files
        #[arg(long)]
        out_dir: PathBuf,

        /// Model table JSON (built-in table if omitted)
        #[arg(long)]
        models: Option<PathBuf>,

        /// Frames per coefficient table
        #[arg(long, default_value_t = DEFAULT_FRAME_COUNT)]
        frames: usize,
    },
}

/// Options of the `pack` command
#[derive(Args, Debug, Clone)]
pub struct PackArgs {
    /// Input .syx file (single-file mode)
    pub input: Option<PathBuf>,

    /// Output container (single-file mode)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Input directory (directory mode)
    #[arg(long)]
    pub in_dir: Option<PathBuf>,

    /// Output directory (directory mode)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Input file pattern, relative to --in-dir
    #[arg(long, default_value = DEFAULT_GLOB)]
    pub glob: String,

    /// Device specification JSON
    #[arg(long, conflicts_with = "device_preset")]
    pub device: Option<PathBuf>,

    /// Built-in device specification (proteus)
    #[arg(long)]
    pub device_preset: Option<String>,

    /// Unpack 7-bit group-packed frames before decoding
    #[arg(long = "unpack-7bit")]
    pub unpack_7bit: bool,

    /// Do not write the JSON sidecar
    #[arg(long)]
    pub no_sidecar: bool,

    /// Synthesize a coefficient table for every layer filter
    #[arg(long)]
    pub coefficients: bool,

    /// Model table JSON for --coefficients (built-in table if omitted)
    #[arg(long, requires = "coefficients")]
    pub models: Option<PathBuf>,

    /// Frames per synthesized coefficient table
    #[arg(long, default_value_t = DEFAULT_FRAME_COUNT)]
    pub frames: usize,

    /// Handling of repeated sequence numbers
    #[arg(long, value_enum, default_value_t = DuplicateArg::LastWins)]
    pub on_duplicate: DuplicateArg,

    /// Handling of missing sequence numbers
    #[arg(long, value_enum, default_value_t = GapArg::Skip)]
    pub on_gap: GapArg,
}

/// Which mode the `pack` arguments select
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackMode {
    Single { input: PathBuf, out: PathBuf },
    Directory { in_dir: PathBuf, out_dir: PathBuf },
}

impl PackArgs {
    /// Directory mode wins when both are given; `None` when neither is complete
    pub fn mode(&self) -> Option<PackMode> {
        if let (Some(in_dir), Some(out_dir)) = (&self.in_dir, &self.out_dir) {
            return Some(PackMode::Directory {
                in_dir: in_dir.clone(),
                out_dir: out_dir.clone(),
            });
        }
        match (&self.input, &self.out) {
            (Some(input), Some(out)) => Some(PackMode::Single {
                input: input.clone(),
                out: out.clone(),
            }),
            _ => None,
        }
    }

    pub fn assembly_policy(&self) -> AssemblyPolicy {
        AssemblyPolicy {
            duplicates: self.on_duplicate.into(),
            gaps: self.on_gap.into(),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateArg {
    LastWins,
    FirstWins,
    Reject,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(arg: DuplicateArg) -> Self {
        match arg {
            DuplicateArg::LastWins => DuplicatePolicy::LastWins,
            DuplicateArg::FirstWins => DuplicatePolicy::FirstWins,
            DuplicateArg::Reject => DuplicatePolicy::Reject,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapArg {
    Skip,
    Reject,
}

impl From<GapArg> for GapPolicy {
    fn from(arg: GapArg) -> Self {
        match arg {
            GapArg::Skip => GapPolicy::Skip,
            GapArg::Reject => GapPolicy::Reject,
        }
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal u16
fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("'{}' is not a 16-bit number: {}", s, e))
}
