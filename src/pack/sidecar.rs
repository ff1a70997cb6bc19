//! Human-readable JSON summary written next to each container

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZpackError};
use crate::preset::layer_filter::LAYER_FILTER_LEN;
use crate::record::{Record, CMD_PRESET_DUMP, SUB_LAYER_FILTER};

/// One sidecar line per container entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarEntry {
    pub id: u32,
    #[serde(rename = "type")]
    pub record_type: u16,
    pub sub: u16,
    pub flags: u16,
    pub length: usize,
    /// Inline payload, only for layer filter records
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bytes: Option<Vec<u8>>,
}

impl SidecarEntry {
    fn from_record(record: &Record) -> Self {
        let inline = record.is(CMD_PRESET_DUMP, SUB_LAYER_FILTER) && record.len() == LAYER_FILTER_LEN;
        Self {
            id: record.id,
            record_type: record.record_type,
            sub: record.subtype,
            flags: record.flags,
            length: record.len(),
            bytes: inline.then(|| record.data.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sidecar {
    pub count: usize,
    pub entries: Vec<SidecarEntry>,
}

impl Sidecar {
    pub fn from_records(records: &[Record]) -> Self {
        Self {
            count: records.len(),
            entries: records.iter().map(SidecarEntry::from_record).collect(),
        }
    }

    /// Sidecar location for a container path
    pub fn path_for(container: &Path) -> std::path::PathBuf {
        container.with_extension("json")
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ZpackError::FileWriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Origin, FLAG_HEURISTIC};
    use tempfile::TempDir;

    fn record(id: u32, subtype: u16, data: Vec<u8>) -> Record {
        Record {
            id,
            record_type: CMD_PRESET_DUMP,
            subtype,
            flags: 0,
            data,
            origin: Origin::Raw,
        }
    }

    #[test]
    fn test_only_layer_filters_are_inlined() {
        let mut filter = record(3, SUB_LAYER_FILTER, (0..14).collect());
        filter.flags = FLAG_HEURISTIC | (1 << 8);
        let records = vec![
            record(0, 0x01, vec![0; 17]),
            filter,
            record(4, SUB_LAYER_FILTER, vec![0; 13]),
        ];

        let sidecar = Sidecar::from_records(&records);
        assert_eq!(sidecar.count, 3);
        assert!(sidecar.entries[0].bytes.is_none());
        assert_eq!(sidecar.entries[1].bytes.as_deref(), Some(&records[1].data[..]));
        assert_eq!(sidecar.entries[1].flags, 0x0104);
        assert!(sidecar.entries[2].bytes.is_none());
    }

    #[test]
    fn test_json_shape() {
        let sidecar = Sidecar::from_records(&[record(7, SUB_LAYER_FILTER, vec![1; 14])]);
        let value = serde_json::to_value(&sidecar).unwrap();

        assert_eq!(value["count"], 1);
        let entry = &value["entries"][0];
        assert_eq!(entry["id"], 7);
        assert_eq!(entry["type"], 0x10);
        assert_eq!(entry["sub"], 0x22);
        assert_eq!(entry["length"], 14);
        assert_eq!(entry["bytes"].as_array().unwrap().len(), 14);
    }

    #[test]
    fn test_write_next_to_container() {
        let dir = TempDir::new().unwrap();
        let container = dir.path().join("bank.bin");
        let path = Sidecar::path_for(&container);
        assert_eq!(path, dir.path().join("bank.json"));

        let sidecar = Sidecar::from_records(&[record(0, 0x01, vec![0; 4])]);
        sidecar.write(&path).unwrap();

        let loaded: Sidecar = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, sidecar);
    }
}
