//! Header-driven layer filter recovery
//!
//! The tail of an assembled preset blob holds the layer filter records
//! followed by the layer envelope records. Their counts come from the preset
//! header, so the filter records can be carved out without decoding the rest
//! of the blob. This is a best-effort recovery, not a full preset decode.

use log::{debug, info};

use super::header::PresetHeader;
use super::layer_filter::LAYER_FILTER_LEN;
use crate::record::{
    Origin, RecordSet, CMD_PRESET_DUMP, FLAG_HEURISTIC, SUB_ASSEMBLED, SUB_HEADER_CLOSED,
    SUB_HEADER_OPEN, SUB_LAYER_FILTER,
};

/// What the segmenter did with a record set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentOutcome {
    /// Layer filter records appended, with their ids
    Carved(Vec<u32>),
    /// Header or assembled record missing, or present more than once
    NotApplicable { headers: usize, assembled: usize },
    /// Header record too short to decode
    HeaderTooShort { len: usize },
    /// Header announces no filter or envelope data
    NothingToCarve,
    /// Announced tail is longer than the assembled blob
    TailTooShort { need: usize, have: usize },
}

impl SegmentOutcome {
    /// Number of layer filter records appended
    pub fn carved(&self) -> usize {
        match self {
            SegmentOutcome::Carved(ids) => ids.len(),
            _ => 0,
        }
    }
}

/// Carve layer filter records out of the assembled preset blob.
///
/// Leaves `records` unchanged unless exactly one header and exactly one
/// assembled record are present and the header's counts fit the blob.
pub fn segment_layer_filters(records: &mut RecordSet) -> SegmentOutcome {
    let headers: Vec<_> = records
        .iter()
        .filter(|r| {
            r.record_type == CMD_PRESET_DUMP
                && (r.subtype == SUB_HEADER_CLOSED || r.subtype == SUB_HEADER_OPEN)
        })
        .collect();
    let assembled: Vec<_> = records.matching(CMD_PRESET_DUMP, SUB_ASSEMBLED).collect();

    let (header, blob) = match (headers.as_slice(), assembled.as_slice()) {
        ([header], [blob]) => (*header, *blob),
        _ => {
            debug!(
                "Segmenter skipped: {} header(s), {} assembled record(s)",
                headers.len(),
                assembled.len()
            );
            return SegmentOutcome::NotApplicable {
                headers: headers.len(),
                assembled: assembled.len(),
            };
        }
    };

    let hdr = match PresetHeader::decode(&header.data) {
        Ok(hdr) => hdr,
        Err(e) => {
            debug!("Segmenter skipped: {}", e);
            return SegmentOutcome::HeaderTooShort {
                len: header.data.len(),
            };
        }
    };

    let filters = usize::from(hdr.counts.layer_filter);
    let need = hdr.carve_need();
    if need == 0 {
        return SegmentOutcome::NothingToCarve;
    }
    if need > blob.data.len() {
        debug!(
            "Segmenter skipped: header needs {} byte(s), assembled blob has {}",
            need,
            blob.data.len()
        );
        return SegmentOutcome::TailTooShort {
            need,
            have: blob.data.len(),
        };
    }

    let tail = &blob.data[blob.data.len() - need..];
    let chunks: Vec<Vec<u8>> = tail[..filters * LAYER_FILTER_LEN]
        .chunks_exact(LAYER_FILTER_LEN)
        .map(<[u8]>::to_vec)
        .collect();

    let ids: Vec<u32> = chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let index = i as u16;
            records.push_derived(
                CMD_PRESET_DUMP,
                SUB_LAYER_FILTER,
                FLAG_HEURISTIC | ((index & 0xFF) << 8),
                chunk,
                Origin::LayerFilterHeuristic { index },
            )
        })
        .collect();

    info!(
        "Recovered {} layer filter record(s) for preset {}",
        ids.len(),
        hdr.preset_number
    );
    SegmentOutcome::Carved(ids)
}
