//! Directory batch mode
//!
//! Every matching input is processed independently. A failing file is
//! reported and counted by error category; the run continues with the next
//! file unless the error is not recoverable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{error, info};
use serde::Serialize;

use crate::error::Result;
use crate::pipeline::{FileSummary, Pipeline};
use crate::scan::{find_files, Glob};

/// Default input pattern for directory mode
pub const DEFAULT_GLOB: &str = "**/*.syx";

/// Why one input could not be packed
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub input: PathBuf,
    /// Stable error category, see [`crate::ZpackError::error_code`]
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum FileOutcome {
    Ok(FileSummary),
    Err(FileFailure),
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, FileOutcome::Ok(_))
    }

    pub fn input(&self) -> &Path {
        match self {
            FileOutcome::Ok(s) => &s.input,
            FileOutcome::Err(f) => &f.input,
        }
    }
}

/// Outcome of a directory run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures_by_category(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            if let FileOutcome::Err(f) = outcome {
                *counts.entry(f.code).or_insert(0) += 1;
            }
        }
        counts
    }

    /// A run succeeds when at least one file was packed
    pub fn is_success(&self) -> bool {
        self.succeeded() > 0
    }
}

/// Output path for `input`: its path relative to `in_dir`, under `out_dir`,
/// with extension `.bin`
pub fn output_path(in_dir: &Path, out_dir: &Path, input: &Path) -> PathBuf {
    let relative = input
        .strip_prefix(in_dir)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| input.file_name().map(PathBuf::from).unwrap_or_default());
    out_dir.join(relative).with_extension("bin")
}

/// Pack every file under `in_dir` matching `glob` into `out_dir`.
///
/// Fails only when the input directory cannot be scanned or a configuration
/// error stops the run.
pub fn run_batch(in_dir: &Path, out_dir: &Path, glob: &Glob, pipeline: &Pipeline) -> Result<BatchReport> {
    let inputs = find_files(in_dir, glob)?;
    info!(
        "Found {} file(s) matching '{}' in {}",
        inputs.len(),
        glob.as_str(),
        in_dir.display()
    );

    let mut report = BatchReport::default();
    for input in inputs {
        let output = output_path(in_dir, out_dir, &input);
        match pipeline.process_file(&input, &output) {
            Ok(summary) => report.outcomes.push(FileOutcome::Ok(summary)),
            Err(e) if !e.is_recoverable() => return Err(e),
            Err(e) => {
                error!("{}: {}", input.display(), e);
                report.outcomes.push(FileOutcome::Err(FileFailure {
                    input,
                    code: e.error_code(),
                    message: e.to_string(),
                }));
            }
        }
    }

    info!(
        "Batch finished: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(report)
}
