//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use serde::Serialize;

use super::{PackArgs, PackMode};
use crate::batch::{run_batch, FileOutcome};
use crate::pack::index::{collect_layer_filters, list_entries, PackIndex};
use crate::pack::{Container, EntryFilter, PresetInspection};
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::scan::Glob;
use crate::sysex::DeviceSpec;
use crate::zplane::{synthesize, CoefficientBlob, CoefficientSynthesizer, ModelTable};

/// Write `value` as pretty JSON to `out`, or to stdout when `out` is `None`
fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn load_models(path: Option<&Path>) -> Result<ModelTable> {
    match path {
        Some(path) => ModelTable::load(path)
            .with_context(|| format!("loading model table {}", path.display())),
        None => Ok(ModelTable::builtin()),
    }
}

/// Build the pipeline configuration from `pack` arguments
pub fn pipeline_options(args: &PackArgs) -> Result<PipelineOptions> {
    let device = match (&args.device, &args.device_preset) {
        (Some(path), _) => Some(
            DeviceSpec::load(path)
                .with_context(|| format!("loading device specification {}", path.display()))?,
        ),
        (None, Some(name)) => Some(
            DeviceSpec::preset(name).ok_or_else(|| anyhow!("unknown device preset '{}'", name))?,
        ),
        (None, None) => None,
    };

    let synthesizer = if args.coefficients {
        let table = load_models(args.models.as_deref())?;
        Some(CoefficientSynthesizer::new(table, args.frames)?)
    } else {
        None
    };

    Ok(PipelineOptions {
        device,
        unpack_7bit: args.unpack_7bit,
        assembly: args.assembly_policy(),
        synthesizer,
        write_sidecar: !args.no_sidecar,
    })
}

/// Pack one file or a directory. The caller has already checked `mode`.
pub fn pack(args: &PackArgs, mode: PackMode) -> Result<ExitCode> {
    let pipeline = Pipeline::new(pipeline_options(args)?);

    match mode {
        PackMode::Single { input, out } => {
            let summary = pipeline
                .process_file(&input, &out)
                .with_context(|| format!("packing {}", input.display()))?;
            println!(
                "Packed {} -> {} ({} bytes, {} records)",
                summary.input.display(),
                summary.output.display(),
                summary.bytes_written,
                summary.records
            );
            Ok(ExitCode::SUCCESS)
        }
        PackMode::Directory { in_dir, out_dir } => {
            let glob = Glob::new(&args.glob)?;
            let report = run_batch(&in_dir, &out_dir, &glob, &pipeline)?;

            for outcome in &report.outcomes {
                match outcome {
                    FileOutcome::Ok(s) => println!(
                        "OK     {} -> {} ({} bytes)",
                        s.input.display(),
                        s.output.display(),
                        s.bytes_written
                    ),
                    FileOutcome::Err(f) => {
                        println!("ERROR  {} [{}] {}", f.input.display(), f.code, f.message)
                    }
                }
            }

            println!(
                "Done. {} file(s) packed, {} failed, output in {}",
                report.succeeded(),
                report.failed(),
                out_dir.display()
            );
            for (code, count) in report.failures_by_category() {
                println!("  {:<28} {}", code, count);
            }

            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Index every container under a directory.
pub fn index(dir: &Path, glob: &str, out: Option<&Path>) -> Result<()> {
    info!("Indexing containers in: {}", dir.display());

    let index = PackIndex::build(dir, &Glob::new(glob)?)?;
    write_json(&index, out)?;

    let s = index.summary;
    eprintln!(
        "Indexed {} pack(s). Layer filters present in {}; assembled preset in {}; {} skipped.",
        s.total_packs, s.with_layer_filter, s.with_assembled_preset, s.skipped
    );
    Ok(())
}

/// Print the preset header and assembled size of one container.
pub fn inspect_preset(path: &Path) -> Result<()> {
    let container =
        Container::open(path).with_context(|| format!("reading {}", path.display()))?;
    let inspection = PresetInspection::of(&container);
    if inspection.header.is_none() {
        eprintln!("No decodable preset header in {}", path.display());
    }
    write_json(&inspection, None)
}

/// Collect layer filter samples across a directory.
pub fn layer_filters(dir: &Path, glob: &str, limit: usize, out: Option<&Path>) -> Result<()> {
    let report = collect_layer_filters(dir, &Glob::new(glob)?, limit)?;
    write_json(&report, out)?;
    eprintln!("Collected {} layer filter entries", report.count);
    Ok(())
}

/// Print the entry table of one container.
pub fn entries(path: &Path, filter: EntryFilter, hex: bool) -> Result<()> {
    let container =
        Container::open(path).with_context(|| format!("reading {}", path.display()))?;

    println!(
        "{:>8}  {:>6}  {:>4}  {:>6}  {:>10}  {:>8}",
        "id", "type", "sub", "flags", "offset", "length"
    );
    println!("{:-<56}", "");
    let rows = list_entries(&container, filter, hex);
    for row in &rows {
        let e = &row.entry;
        println!(
            "{:>8}  0x{:04X}  0x{:02X}  0x{:04X}  {:>10}  {:>8}",
            e.id, e.record_type, e.subtype, e.flags, e.offset, e.length
        );
        if let Some(hex) = &row.hex {
            println!("          {}", hex);
        }
    }
    println!("{} of {} entries", rows.len(), container.len());
    Ok(())
}

/// Export every model as `<name>.zmf1`, re-decode it and report stability.
pub fn models(models: Option<&Path>, out_dir: &Path, frames: usize) -> Result<ExitCode> {
    let table = load_models(models)?;
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut all_stable = true;
    for model in table.models() {
        let blob = synthesize(model, frames)?;
        let path = out_dir.join(format!("{}.zmf1", model.name));
        fs::write(&path, blob.encode()).with_context(|| format!("writing {}", path.display()))?;

        let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let decoded = CoefficientBlob::decode(&bytes)?;
        if decoded != blob {
            bail!("{} did not decode to the table it was written from", path.display());
        }

        let ratio = decoded.stability_ratio();
        all_stable &= ratio >= 1.0;
        println!(
            "{:<16} id {:>3}  {} frames x {} sections  stable {:>5.1}%  {}",
            model.name,
            model.id,
            decoded.frame_count(),
            decoded.section_count(),
            ratio * 100.0,
            path.display()
        );
    }

    Ok(if all_stable {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use tempfile::TempDir;

    fn pack_args(argv: &[&str]) -> PackArgs {
        let mut full = vec!["zpack", "pack"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Pack(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_pipeline_options_from_args() {
        let args = pack_args(&["a.syx", "--out", "a.bin", "--device-preset", "proteus", "--no-sidecar"]);
        let options = pipeline_options(&args).unwrap();
        assert_eq!(options.device, Some(DeviceSpec::emu_proteus()));
        assert!(!options.write_sidecar);
        assert!(options.synthesizer.is_none());
    }

    #[test]
    fn test_unknown_device_preset() {
        let args = pack_args(&["a.syx", "--out", "a.bin", "--device-preset", "nord"]);
        assert!(pipeline_options(&args).is_err());
    }

    #[test]
    fn test_invalid_frame_count() {
        let args = pack_args(&["a.syx", "--out", "a.bin", "--coefficients", "--frames", "0"]);
        assert!(pipeline_options(&args).is_err());
    }

    #[test]
    fn test_models_export() {
        let dir = TempDir::new().unwrap();
        models(None, dir.path(), 11).unwrap();
        for name in ["vowel_pair", "bell_pair", "low_pair"] {
            assert!(dir.path().join(format!("{}.zmf1", name)).exists());
        }
    }

    #[test]
    fn test_write_json_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports/out.json");
        write_json(&serde_json::json!({ "count": 0 }), Some(&path)).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("\"count\": 0"));
    }
}
