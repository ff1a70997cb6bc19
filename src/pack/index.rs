//! Read-only tools over written containers: directory index, layer filter
//! sampling, preset inspection and entry filtering.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::container::{Container, Entry};
use crate::error::Result;
use crate::preset::layer_filter::LAYER_FILTER_LEN;
use crate::preset::{LayerFilter, PresetHeader};
use crate::record::{
    CMD_PRESET_DUMP, SUB_ASSEMBLED, SUB_HEADER_CLOSED, SUB_HEADER_OPEN, SUB_LAYER_FILTER,
};
use crate::scan::{find_files, Glob};

/// Optional type/subtype filter for entry listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub record_type: Option<u16>,
    pub subtype: Option<u16>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &Entry) -> bool {
        self.record_type.map_or(true, |t| entry.record_type == t)
            && self.subtype.map_or(true, |s| entry.subtype == s)
    }
}

/// Hex digest of a container's bytes
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// What the index records about one container
#[derive(Debug, Clone, Serialize)]
pub struct PackSummary {
    pub entries: Vec<Entry>,
    pub sha256: String,
    pub has_layer_filter: bool,
    pub has_assembled_preset: bool,
}

impl PackSummary {
    pub fn of(container: &Container) -> Self {
        Self {
            entries: container.entries().to_vec(),
            sha256: sha256_hex(container.as_bytes()),
            has_layer_filter: container.contains(CMD_PRESET_DUMP, SUB_LAYER_FILTER),
            has_assembled_preset: container.contains(CMD_PRESET_DUMP, SUB_ASSEMBLED),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IndexSummary {
    pub total_packs: usize,
    pub with_layer_filter: usize,
    pub with_assembled_preset: usize,
    /// Matching files that were not valid containers
    pub skipped: usize,
}

/// Index of every container found under a directory
#[derive(Debug, Clone, Serialize)]
pub struct PackIndex {
    pub summary: IndexSummary,
    pub generated_at: DateTime<Utc>,
    pub packs: BTreeMap<String, PackSummary>,
}

impl PackIndex {
    /// Scan `dir` for files matching `glob`. Unreadable or malformed files
    /// are skipped and counted.
    pub fn build(dir: &Path, glob: &Glob) -> Result<Self> {
        let mut summary = IndexSummary::default();
        let mut packs = BTreeMap::new();

        for path in find_files(dir, glob)? {
            let container = match Container::open(&path) {
                Ok(c) => c,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    summary.skipped += 1;
                    continue;
                }
            };

            let pack = PackSummary::of(&container);
            summary.total_packs += 1;
            summary.with_layer_filter += usize::from(pack.has_layer_filter);
            summary.with_assembled_preset += usize::from(pack.has_assembled_preset);
            packs.insert(path.display().to_string(), pack);
        }

        Ok(Self {
            summary,
            generated_at: Utc::now(),
            packs,
        })
    }
}

/// One decoded layer filter entry and where it came from
#[derive(Debug, Clone, Serialize)]
pub struct LayerFilterSample {
    pub pack: String,
    pub id: u32,
    pub flags: u16,
    pub bytes: Vec<u8>,
    pub decode: LayerFilter,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerFilterReport {
    pub count: usize,
    pub items: Vec<LayerFilterSample>,
}

/// Collect up to `limit` layer filter entries from containers under `dir`.
///
/// Entries of the wrong length are skipped with a warning.
pub fn collect_layer_filters(dir: &Path, glob: &Glob, limit: usize) -> Result<LayerFilterReport> {
    let mut items = Vec::new();

    'files: for path in find_files(dir, glob)? {
        let container = match Container::open(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        for (entry, payload) in container.find(CMD_PRESET_DUMP, SUB_LAYER_FILTER) {
            if items.len() >= limit {
                break 'files;
            }
            match LayerFilter::decode(entry.id, payload) {
                Ok(decode) => items.push(LayerFilterSample {
                    pack: path.display().to_string(),
                    id: entry.id,
                    flags: entry.flags,
                    bytes: payload.to_vec(),
                    decode,
                }),
                Err(e) => warn!("{}: {}", path.display(), e),
            }
        }
    }

    Ok(LayerFilterReport {
        count: items.len(),
        items,
    })
}

/// Preset header and assembled blob size of one container
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetInspection {
    pub header_id: Option<u32>,
    pub header: Option<PresetHeader>,
    /// Number of bytes a layer filter/envelope carve needs from the tail
    pub carve_need: Option<usize>,
    pub assembled_len: Option<u32>,
}

impl PresetInspection {
    pub fn of(container: &Container) -> Self {
        let header_entry = container
            .find(CMD_PRESET_DUMP, SUB_HEADER_CLOSED)
            .chain(container.find(CMD_PRESET_DUMP, SUB_HEADER_OPEN))
            .next();

        let header = header_entry.and_then(|(entry, payload)| match PresetHeader::decode(payload) {
            Ok(h) => Some(h),
            Err(e) => {
                warn!("Header entry {}: {}", entry.id, e);
                None
            }
        });

        Self {
            header_id: header_entry.map(|(e, _)| e.id),
            carve_need: header.map(|h| h.carve_need()),
            header,
            assembled_len: container
                .find(CMD_PRESET_DUMP, SUB_ASSEMBLED)
                .next()
                .map(|(e, _)| e.length),
        }
    }
}

/// Inline hex for a payload, as used by entry listings
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Entries of a container matching `filter`, as serializable rows
pub fn list_entries(container: &Container, filter: EntryFilter, with_hex: bool) -> Vec<EntryRow> {
    container
        .entries()
        .iter()
        .filter(|e| filter.matches(e))
        .map(|e| EntryRow {
            entry: *e,
            hex: with_hex.then(|| hex(container.payload(e))),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryRow {
    #[serde(flatten)]
    pub entry: Entry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
}
