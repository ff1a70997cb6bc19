//! Preset continuation packet reassembly
//!
//! Each continuation packet carries a sequence key in its first two data bytes
//! (`data[0] | data[1] << 7`) and a checksum in its last. Payloads are ordered
//! by key and concatenated into one assembled record.
//!
//! For device frames `data[0]` is the subtype byte, so the keys of one dump
//! share their low seven bits and step by 128. Gaps are therefore looked for
//! per low-bit lane, in the high part of the key.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::error::{Result, ZpackError};
use crate::record::{
    Origin, Record, RecordSet, CMD_PRESET_DUMP, FLAG_ASSEMBLED, SUB_ASSEMBLED,
    SUB_CONTINUATION_A, SUB_CONTINUATION_B,
};

/// What to do when a sequence number arrives twice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep the packet seen last
    #[default]
    LastWins,
    /// Keep the packet seen first
    FirstWins,
    /// Fail the preset
    Reject,
}

/// What to do when sequence numbers are missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    /// Concatenate what is present
    #[default]
    Skip,
    /// Fail the preset
    Reject,
}

/// Reassembly policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssemblyPolicy {
    pub duplicates: DuplicatePolicy,
    pub gaps: GapPolicy,
}

/// Merges continuation packets into one blob per preset
#[derive(Debug, Clone, Copy, Default)]
pub struct PresetAssembler {
    policy: AssemblyPolicy,
}

/// Sequence number and payload of one continuation packet
fn split_packet(record: &Record) -> Option<(u16, &[u8])> {
    let data = &record.data;
    if data.len() < 3 {
        return None;
    }
    let seq = u16::from(data[0]) | (u16::from(data[1]) << 7);
    Some((seq, &data[2..data.len() - 1]))
}

fn is_continuation(record: &Record) -> bool {
    record.record_type == CMD_PRESET_DUMP
        && (record.subtype == SUB_CONTINUATION_A || record.subtype == SUB_CONTINUATION_B)
}

impl PresetAssembler {
    pub fn new(policy: AssemblyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> AssemblyPolicy {
        self.policy
    }

    /// Assemble all continuation packets in `records`.
    ///
    /// Appends one assembled record and returns its id, or `None` when no
    /// payload bytes were collected.
    pub fn assemble(&self, records: &mut RecordSet) -> Result<Option<u32>> {
        let mut parts: BTreeMap<u16, &[u8]> = BTreeMap::new();
        let mut duplicates = Vec::new();
        let mut packets = 0usize;

        for (seq, payload) in records
            .iter()
            .filter(|r| is_continuation(r))
            .filter_map(split_packet)
        {
            packets += 1;
            match parts.entry(seq) {
                Entry::Vacant(slot) => {
                    slot.insert(payload);
                }
                Entry::Occupied(mut slot) => {
                    duplicates.push(seq);
                    match self.policy.duplicates {
                        DuplicatePolicy::LastWins => {
                            slot.insert(payload);
                        }
                        DuplicatePolicy::FirstWins => {}
                        DuplicatePolicy::Reject => {
                            return Err(ZpackError::DuplicateSequence { seq });
                        }
                    }
                }
            }
        }

        let gaps = missing_sequences(&parts);
        if !gaps.is_empty() {
            if self.policy.gaps == GapPolicy::Reject {
                return Err(ZpackError::IncompleteSequence { missing: gaps });
            }
            warn!(
                "Preset sequence has {} missing packet(s), first {}",
                gaps.len(),
                gaps[0]
            );
        }
        if !duplicates.is_empty() {
            warn!(
                "Preset sequence numbers received more than once: {:?} ({:?})",
                duplicates, self.policy.duplicates
            );
        }

        let assembled: Vec<u8> = parts.values().flat_map(|p| p.iter().copied()).collect();
        if assembled.is_empty() {
            return Ok(None);
        }

        debug!(
            "Assembled {} byte(s) from {} packet(s)",
            assembled.len(),
            packets
        );
        let id = records.push_derived(
            CMD_PRESET_DUMP,
            SUB_ASSEMBLED,
            FLAG_ASSEMBLED,
            assembled,
            Origin::Assembled {
                packets,
                gaps,
                duplicates,
            },
        );
        Ok(Some(id))
    }
}

/// Keys absent between the lowest and highest present key of each lane.
///
/// A lane is the set of keys sharing their low seven bits; within a lane the
/// high part (`key >> 7`) must be contiguous.
fn missing_sequences(parts: &BTreeMap<u16, &[u8]>) -> Vec<u16> {
    let mut lanes: BTreeMap<u16, BTreeSet<u16>> = BTreeMap::new();
    for &key in parts.keys() {
        lanes.entry(key & 0x7F).or_default().insert(key >> 7);
    }

    let mut missing: Vec<u16> = lanes
        .iter()
        .flat_map(|(&lane, highs)| {
            let (Some(&lo), Some(&hi)) = (highs.first(), highs.last()) else {
                return Vec::new();
            };
            (lo..=hi)
                .filter(|h| !highs.contains(h))
                .map(|h| lane | (h << 7))
                .collect::<Vec<u16>>()
        })
        .collect();
    missing.sort_unstable();
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysex::{CanonicalMessage, ChecksumStatus};

    fn packet(id: u32, subtype: u8, seq: u16, payload: &[u8]) -> Record {
        let mut data = vec![(seq & 0x7F) as u8, (seq >> 7) as u8];
        data.extend_from_slice(payload);
        data.push(0x00); // checksum
        Record::canonical(
            id,
            CanonicalMessage {
                family: 0x0F,
                device_id: 0,
                editor: 0x55,
                command: 0x10,
                subtype: Some(subtype),
                data,
                checksum: ChecksumStatus::Unchecked,
            },
        )
    }

    /// Packet laid out as a device sends it: subtype, sequence high bits,
    /// payload, checksum
    fn device_packet(id: u32, index: u8, payload: &[u8]) -> Record {
        let mut data = vec![0x02, index];
        data.extend_from_slice(payload);
        data.push(0x00);
        let mut rec = packet(id, 0x02, 0, &[]);
        rec.data = data;
        rec
    }

    fn reject_gaps() -> PresetAssembler {
        PresetAssembler::new(AssemblyPolicy {
            gaps: GapPolicy::Reject,
            ..Default::default()
        })
    }

    #[test]
    fn test_assembles_in_sequence_order() {
        let mut set = RecordSet::from_records(vec![
            packet(0, 0x02, 2, &[0x20, 0x21]),
            packet(1, 0x02, 0, &[0x00]),
            packet(2, 0x04, 1, &[0x10, 0x11, 0x12]),
        ]);

        let id = PresetAssembler::default().assemble(&mut set).unwrap().unwrap();
        let rec = set.get(id).unwrap();

        assert_eq!(id, 3);
        assert_eq!(rec.data, vec![0x00, 0x10, 0x11, 0x12, 0x20, 0x21]);
        assert_eq!(rec.subtype, SUB_ASSEMBLED);
        assert_eq!(rec.flags, FLAG_ASSEMBLED);
        assert!(matches!(
            &rec.origin,
            Origin::Assembled { packets: 3, gaps, duplicates } if gaps.is_empty() && duplicates.is_empty()
        ));
    }

    #[test]
    fn test_fourteen_bit_sequence_numbers() {
        let mut set = RecordSet::from_records(vec![
            packet(0, 0x02, 128, &[0xBB]),
            packet(1, 0x02, 127, &[0xAA]),
        ]);
        let id = PresetAssembler::default().assemble(&mut set).unwrap().unwrap();
        assert_eq!(set.get(id).unwrap().data, vec![0xAA, 0xBB]);
    }

    #[test]
    fn test_contiguous_device_packets_have_no_gaps() {
        let mut set = RecordSet::from_records(vec![
            device_packet(0, 2, &[0x30]),
            device_packet(1, 0, &[0x10]),
            device_packet(2, 1, &[0x20]),
        ]);

        let id = reject_gaps().assemble(&mut set).unwrap().unwrap();
        let rec = set.get(id).unwrap();
        assert_eq!(rec.data, vec![0x10, 0x20, 0x30]);
        assert!(matches!(&rec.origin, Origin::Assembled { gaps, .. } if gaps.is_empty()));
    }

    #[test]
    fn test_sequence_bytes_are_not_masked() {
        // data[0] 0x82 and 0x02 give keys 130 and 2
        let mut high = packet(0, 0x02, 0, &[]);
        high.data = vec![0x82, 0x00, 0xAA, 0x00];
        let mut low = packet(1, 0x02, 0, &[]);
        low.data = vec![0x02, 0x00, 0xBB, 0x00];
        let mut set = RecordSet::from_records(vec![high, low]);

        let id = PresetAssembler::default().assemble(&mut set).unwrap().unwrap();
        let rec = set.get(id).unwrap();
        assert_eq!(rec.data, vec![0xBB, 0xAA]);
        assert!(matches!(&rec.origin, Origin::Assembled { duplicates, .. } if duplicates.is_empty()));
    }

    #[test]
    fn test_gaps_are_skipped_by_default() {
        let mut set = RecordSet::from_records(vec![
            device_packet(0, 0, &[0x01]),
            device_packet(1, 3, &[0x04]),
        ]);
        let id = PresetAssembler::default().assemble(&mut set).unwrap().unwrap();
        let rec = set.get(id).unwrap();

        assert_eq!(rec.data, vec![0x01, 0x04]);
        match &rec.origin {
            Origin::Assembled { gaps, .. } => assert_eq!(gaps, &vec![2 | (1 << 7), 2 | (2 << 7)]),
            other => panic!("Expected assembled origin, got: {:?}", other),
        }
    }

    #[test]
    fn test_gap_reject_policy() {
        let mut set = RecordSet::from_records(vec![
            device_packet(0, 0, &[0x01]),
            device_packet(1, 2, &[0x03]),
        ]);

        let err = reject_gaps().assemble(&mut set).unwrap_err();
        assert!(matches!(err, ZpackError::IncompleteSequence { ref missing } if missing == &vec![130]));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_lanes_are_checked_separately() {
        let parts: BTreeMap<u16, &[u8]> = [
            (2, &[][..]),
            (2 | (1 << 7), &[][..]),
            (4, &[][..]),
            (4 | (3 << 7), &[][..]),
        ]
        .into_iter()
        .collect();
        assert_eq!(missing_sequences(&parts), vec![4 | (1 << 7), 4 | (2 << 7)]);
    }

    #[test]
    fn test_duplicate_policies() {
        let records = vec![
            packet(0, 0x02, 0, &[0xAA]),
            packet(1, 0x02, 0, &[0xBB]),
        ];

        let mut set = RecordSet::from_records(records.clone());
        let id = PresetAssembler::default().assemble(&mut set).unwrap().unwrap();
        assert_eq!(set.get(id).unwrap().data, vec![0xBB]);

        let mut set = RecordSet::from_records(records.clone());
        let first = PresetAssembler::new(AssemblyPolicy {
            duplicates: DuplicatePolicy::FirstWins,
            ..Default::default()
        });
        let id = first.assemble(&mut set).unwrap().unwrap();
        assert_eq!(set.get(id).unwrap().data, vec![0xAA]);

        let mut set = RecordSet::from_records(records);
        let reject = PresetAssembler::new(AssemblyPolicy {
            duplicates: DuplicatePolicy::Reject,
            ..Default::default()
        });
        assert!(matches!(
            reject.assemble(&mut set),
            Err(ZpackError::DuplicateSequence { seq: 0 })
        ));
    }

    #[test]
    fn test_headers_and_short_packets_are_ignored() {
        let mut set = RecordSet::from_records(vec![
            packet(0, 0x01, 0, &[0x55; 20]),
            packet(1, 0x02, 0, &[]),
        ]);
        assert_eq!(PresetAssembler::default().assemble(&mut set).unwrap(), None);
        assert_eq!(set.len(), 2);
    }
}
