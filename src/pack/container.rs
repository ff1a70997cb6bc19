//! ZPK1 container format
//!
//! ```text
//! 0           magic "ZPK1"   4 bytes
//! 4           version        u16 (=1)
//! 6           count          u16
//! 8           entry table    count x 18 bytes:
//!                            id u32, type u16, subtype u16, flags u16,
//!                            offset u32, length u32
//! 8 + 18*n    payloads, in entry order
//! ```
//!
//! Offsets are absolute file offsets. Payload regions tile the area after the
//! entry table with no gaps or overlaps.

use std::fs;
use std::ops::Range;
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, ZpackError};
use crate::record::Record;

pub const MAGIC: &[u8; 4] = b"ZPK1";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 8;
pub const ENTRY_LEN: usize = 4 + 2 + 2 + 2 + 4 + 4;

/// One row of the entry table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub id: u32,
    #[serde(rename = "type")]
    pub record_type: u16,
    #[serde(rename = "sub")]
    pub subtype: u16,
    pub flags: u16,
    pub offset: u32,
    pub length: u32,
}

impl Entry {
    /// Byte range of the payload within the container
    pub fn range(&self) -> Range<usize> {
        let start = self.offset as usize;
        start..start + self.length as usize
    }

    pub fn is(&self, record_type: u16, subtype: u16) -> bool {
        self.record_type == record_type && self.subtype == subtype
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.record_type.to_le_bytes());
        out.extend_from_slice(&self.subtype.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.offset.to_le_bytes());
        out.extend_from_slice(&self.length.to_le_bytes());
    }

    fn read(b: &[u8]) -> Self {
        Self {
            id: u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            record_type: u16::from_le_bytes([b[4], b[5]]),
            subtype: u16::from_le_bytes([b[6], b[7]]),
            flags: u16::from_le_bytes([b[8], b[9]]),
            offset: u32::from_le_bytes([b[10], b[11], b[12], b[13]]),
            length: u32::from_le_bytes([b[14], b[15], b[16], b[17]]),
        }
    }
}

fn overflow(reason: String) -> ZpackError {
    ZpackError::ContainerOverflow { reason }
}

/// Entry table for `records`, with offsets running from the end of the table
pub fn layout(records: &[Record]) -> Result<Vec<Entry>> {
    if records.len() > usize::from(u16::MAX) {
        return Err(overflow(format!("{} records (maximum {})", records.len(), u16::MAX)));
    }

    let mut offset = (HEADER_LEN + records.len() * ENTRY_LEN) as u64;
    let mut entries = Vec::with_capacity(records.len());
    for record in records {
        let length = record.data.len() as u64;
        if offset + length > u64::from(u32::MAX) {
            return Err(overflow(format!(
                "record {} ends past the 4 GiB offset limit",
                record.id
            )));
        }
        entries.push(Entry {
            id: record.id,
            record_type: record.record_type,
            subtype: record.subtype,
            flags: record.flags,
            offset: offset as u32,
            length: length as u32,
        });
        offset += length;
    }
    Ok(entries)
}

/// Serialize `records` into a ZPK1 container, in order
pub fn pack(records: &[Record]) -> Result<Vec<u8>> {
    let entries = layout(records)?;
    let total = entries
        .last()
        .map_or(HEADER_LEN, |e| e.offset as usize + e.length as usize);

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in &entries {
        entry.write(&mut out);
    }
    for record in records {
        out.extend_from_slice(&record.data);
    }
    debug_assert_eq!(out.len(), total);
    Ok(out)
}

fn malformed(reason: String) -> ZpackError {
    ZpackError::MalformedContainer { reason }
}

/// A parsed, validated ZPK1 container
#[derive(Debug, Clone)]
pub struct Container {
    bytes: Vec<u8>,
    entries: Vec<Entry>,
}

impl Container {
    /// Parse a container, checking magic, version and every entry's bounds
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(malformed(format!("{} bytes is shorter than the header", bytes.len())));
        }
        if &bytes[0..4] != MAGIC {
            return Err(malformed(format!("bad magic {:02X?}", &bytes[0..4])));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(malformed(format!("unsupported version {}", version)));
        }
        let count = usize::from(u16::from_le_bytes([bytes[6], bytes[7]]));
        let table_end = HEADER_LEN + count * ENTRY_LEN;
        if bytes.len() < table_end {
            return Err(malformed(format!(
                "entry table for {} entries is truncated",
                count
            )));
        }

        let entries: Vec<Entry> = bytes[HEADER_LEN..table_end]
            .chunks_exact(ENTRY_LEN)
            .map(Entry::read)
            .collect();
        if let Some(bad) = entries
            .iter()
            .find(|e| u64::from(e.offset) + u64::from(e.length) > bytes.len() as u64)
        {
            return Err(malformed(format!(
                "entry {} spans {}..{} past the end of the file ({} bytes)",
                bad.id,
                bad.offset,
                u64::from(bad.offset) + u64::from(bad.length),
                bytes.len()
            )));
        }

        Ok(Self { bytes, entries })
    }

    /// Read and parse a container file
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ZpackError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = fs::read(path).map_err(|e| ZpackError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_bytes(bytes)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Payload bytes of an entry of this container
    pub fn payload(&self, entry: &Entry) -> &[u8] {
        &self.bytes[entry.range()]
    }

    /// Entries with the given type and subtype, paired with their payloads
    pub fn find(&self, record_type: u16, subtype: u16) -> impl Iterator<Item = (&Entry, &[u8])> {
        self.entries
            .iter()
            .filter(move |e| e.is(record_type, subtype))
            .map(move |e| (e, self.payload(e)))
    }

    /// Whether at least one entry has the given type and subtype
    pub fn contains(&self, record_type: u16, subtype: u16) -> bool {
        self.entries.iter().any(|e| e.is(record_type, subtype))
    }

    pub fn get(&self, id: u32) -> Option<(&Entry, &[u8])> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| (e, self.payload(e)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
