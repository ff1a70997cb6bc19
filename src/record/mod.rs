//! Typed Records
//!
//! Every stage of the pipeline reads and appends [`Record`]s held in one
//! [`RecordSet`] per input file. Records are never modified after they are
//! appended; derived data is always a new record with a fresh id.

mod ids;

pub use ids::IdAllocator;

use crate::sysex::{CanonicalMessage, ChecksumStatus};

/// Preset dump command family
pub const CMD_PRESET_DUMP: u16 = 0x10;

/// Preset header, closed form
pub const SUB_HEADER_CLOSED: u16 = 0x01;
/// Preset continuation packet, variant A
pub const SUB_CONTINUATION_A: u16 = 0x02;
/// Preset header, open form
pub const SUB_HEADER_OPEN: u16 = 0x03;
/// Preset continuation packet, variant B
pub const SUB_CONTINUATION_B: u16 = 0x04;
/// Layer filter parameters
pub const SUB_LAYER_FILTER: u16 = 0x22;
/// Reassembled preset blob
pub const SUB_ASSEMBLED: u16 = 0xFE;

/// Record type of synthesized coefficient blobs ("ZM")
pub const TYPE_COEFFICIENTS: u16 = 0x5A4D;

/// Canonical record whose checksum did not verify
pub const FLAG_CHECKSUM_INVALID: u16 = 0x0001;
/// Reassembled preset blob
pub const FLAG_ASSEMBLED: u16 = 0x0002;
/// Heuristically carved record; the high byte holds its index
pub const FLAG_HEURISTIC: u16 = 0x0004;
/// Coefficient blob tag ("F1")
pub const FLAG_COEFFICIENTS: u16 = 0x4631;

/// Where a record came from, with the fields that only make sense for that kind
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    /// Frame packed verbatim because no device specification was given
    Raw,
    /// Frame matched against a device specification
    Canonical {
        device_id: u8,
        checksum: ChecksumStatus,
    },
    /// Continuation packets concatenated in sequence order
    Assembled {
        packets: usize,
        /// Sequence numbers missing between the lowest and highest seen
        gaps: Vec<u16>,
        /// Sequence numbers received more than once
        duplicates: Vec<u16>,
    },
    /// Layer filter carved from the tail of an assembled blob
    LayerFilterHeuristic { index: u16 },
    /// Coefficient table synthesized for a pole model
    Coefficients {
        model: String,
        model_id: u16,
        source_id: u32,
    },
}

/// One typed record, as stored in a container entry
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: u32,
    pub record_type: u16,
    pub subtype: u16,
    pub flags: u16,
    pub data: Vec<u8>,
    pub origin: Origin,
}

impl Record {
    /// Record for a frame core packed without decoding
    pub fn raw(id: u32, core: &[u8]) -> Self {
        Self {
            id,
            record_type: 0,
            subtype: 0,
            flags: 0,
            data: core.to_vec(),
            origin: Origin::Raw,
        }
    }

    /// Record for a message matched against a device specification
    pub fn canonical(id: u32, msg: CanonicalMessage) -> Self {
        let flags = if msg.checksum.is_valid() {
            0
        } else {
            FLAG_CHECKSUM_INVALID
        };
        Self {
            id,
            record_type: u16::from(msg.command),
            subtype: msg.subtype.map(u16::from).unwrap_or(0),
            flags,
            data: msg.data,
            origin: Origin::Canonical {
                device_id: msg.device_id,
                checksum: msg.checksum,
            },
        }
    }

    /// False only for canonical records with a mismatched checksum
    pub fn checksum_valid(&self) -> bool {
        match &self.origin {
            Origin::Canonical { checksum, .. } => checksum.is_valid(),
            _ => true,
        }
    }

    /// Matches on record type and subtype
    pub fn is(&self, record_type: u16, subtype: u16) -> bool {
        self.record_type == record_type && self.subtype == subtype
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Ordered record collection for one input file, with its id allocator
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<Record>,
    ids: IdAllocator,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from records that already carry ids.
    ///
    /// Derived records get ids above the highest existing one.
    pub fn from_records(records: Vec<Record>) -> Self {
        let ids = IdAllocator::after(records.iter().map(|r| r.id).max());
        Self { records, ids }
    }

    /// Append a record that already has an id, keeping the allocator ahead of it
    pub fn push(&mut self, record: Record) {
        self.ids.reserve(record.id);
        self.records.push(record);
    }

    /// Append a derived record, assigning it the next id
    pub fn push_derived(
        &mut self,
        record_type: u16,
        subtype: u16,
        flags: u16,
        data: Vec<u8>,
        origin: Origin,
    ) -> u32 {
        let id = self.ids.next_id();
        self.records.push(Record {
            id,
            record_type,
            subtype,
            flags,
            data,
            origin,
        });
        id
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn get(&self, id: u32) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Records with the given type and subtype, in emission order
    pub fn matching(&self, record_type: u16, subtype: u16) -> impl Iterator<Item = &Record> {
        self.records
            .iter()
            .filter(move |r| r.is(record_type, subtype))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
