//! Coefficient table synthesis and the pipeline stage that attaches it

use log::{debug, warn};

use super::coeffs::{interpolate_pole, BiquadCoeffs};
use super::model::{ModelTable, PoleModel};
use super::zmf1::{CoefficientBlob, MAX_FRAMES};
use crate::error::{Result, ZpackError};
use crate::preset::layer_filter::LAYER_FILTER_LEN;
use crate::record::{
    Origin, Record, RecordSet, CMD_PRESET_DUMP, FLAG_COEFFICIENTS, SUB_LAYER_FILTER,
    TYPE_COEFFICIENTS,
};

/// Morph frames generated per model unless configured otherwise
pub const DEFAULT_FRAME_COUNT: usize = 11;

/// Precompute `frame_count` cascades morphing from frame A to frame B
pub fn synthesize(model: &PoleModel, frame_count: usize) -> Result<CoefficientBlob> {
    if frame_count == 0 || frame_count > MAX_FRAMES {
        return Err(ZpackError::InvalidFrameCount { count: frame_count });
    }

    let frames: Vec<Vec<BiquadCoeffs>> = (0..frame_count)
        .map(|f| {
            let t = if frame_count > 1 {
                f as f32 / (frame_count - 1) as f32
            } else {
                0.0
            };
            model
                .frame_a
                .iter()
                .zip(&model.frame_b)
                .map(|(&a, &b)| BiquadCoeffs::from_pole(interpolate_pole(a, b, t)))
                .collect()
        })
        .collect();

    CoefficientBlob::from_frames(model.id, frames)
}

/// Attaches a coefficient table to every layer filter record
#[derive(Debug, Clone)]
pub struct CoefficientSynthesizer {
    table: ModelTable,
    frame_count: usize,
}

impl CoefficientSynthesizer {
    pub fn new(table: ModelTable, frame_count: usize) -> Result<Self> {
        if frame_count == 0 || frame_count > MAX_FRAMES {
            return Err(ZpackError::InvalidFrameCount { count: frame_count });
        }
        Ok(Self { table, frame_count })
    }

    pub fn table(&self) -> &ModelTable {
        &self.table
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Placeholder model choice: first data byte modulo the table size.
    ///
    /// This is NOT a decoded mapping from the layer's filter parameters to a
    /// model; it only spreads records across the table until that mapping is
    /// known. Do not rely on which model a record receives.
    pub fn placeholder_model(&self, record: &Record) -> Option<&PoleModel> {
        let first = *record.data.first()?;
        if self.table.is_empty() {
            return None;
        }
        self.table.by_index(usize::from(first) % self.table.len())
    }

    /// Append one coefficient record per layer filter record of at least 14 bytes.
    ///
    /// Returns the ids of the appended records.
    pub fn augment(&self, records: &mut RecordSet) -> Result<Vec<u32>> {
        let mut pending = Vec::new();
        for record in records.matching(CMD_PRESET_DUMP, SUB_LAYER_FILTER) {
            if record.data.len() < LAYER_FILTER_LEN {
                warn!(
                    "Layer filter record {} has {} byte(s), skipping coefficient synthesis",
                    record.id,
                    record.data.len()
                );
                continue;
            }
            let Some(model) = self.placeholder_model(record) else {
                continue;
            };
            let blob = synthesize(model, self.frame_count)?;
            pending.push((record.id, model.name.clone(), model.id, blob.encode()));
        }

        let ids = pending
            .into_iter()
            .map(|(source_id, model, model_id, data)| {
                debug!("Synthesized {} coefficients for record {}", model, source_id);
                records.push_derived(
                    TYPE_COEFFICIENTS,
                    0,
                    FLAG_COEFFICIENTS,
                    data,
                    Origin::Coefficients {
                        model,
                        model_id,
                        source_id,
                    },
                )
            })
            .collect();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FLAG_HEURISTIC;
    use approx::assert_relative_eq;

    #[test]
    fn test_synthesize_shape() {
        let table = ModelTable::builtin();
        let model = table.by_name("vowel_pair").unwrap();
        let blob = synthesize(model, DEFAULT_FRAME_COUNT).unwrap();

        assert_eq!(blob.frame_count(), 11);
        assert_eq!(blob.section_count(), 6);
        assert_eq!(blob.model_id, 0);
        assert_eq!(blob.encode().len(), 16 + 11 * 6 * 20);
    }

    #[test]
    fn test_endpoint_frames_match_model_poles() {
        let table = ModelTable::builtin();
        let model = table.by_name("bell_pair").unwrap();
        let blob = synthesize(model, 5).unwrap();

        let first = blob.frame(0).unwrap();
        let last = blob.frame(4).unwrap();
        for s in 0..6 {
            let a = BiquadCoeffs::from_pole(model.frame_a[s]);
            let b = BiquadCoeffs::from_pole(model.frame_b[s]);
            assert_relative_eq!(first[s].a1, a.a1, epsilon = 1e-6);
            assert_relative_eq!(first[s].a2, a.a2, epsilon = 1e-6);
            assert_relative_eq!(last[s].a1, b.a1, epsilon = 1e-5);
            assert_relative_eq!(last[s].b0, b.b0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_single_frame_uses_frame_a() {
        let table = ModelTable::builtin();
        let model = table.by_name("low_pair").unwrap();
        let blob = synthesize(model, 1).unwrap();

        assert_eq!(blob.frame_count(), 1);
        assert_eq!(blob.frame(0).unwrap()[0], BiquadCoeffs::from_pole(model.frame_a[0]));
    }

    #[test]
    fn test_builtin_models_are_stable() {
        for model in ModelTable::builtin().models() {
            let blob = synthesize(model, 64).unwrap();
            assert!(blob.sections().iter().all(|c| c.is_stable()), "{}", model.name);
        }
    }

    #[test]
    fn test_rejects_bad_frame_counts() {
        let table = ModelTable::builtin();
        let model = table.by_index(0).unwrap();
        assert!(synthesize(model, 0).is_err());
        assert!(synthesize(model, 65).is_err());
        assert!(CoefficientSynthesizer::new(ModelTable::builtin(), 0).is_err());
    }

    #[test]
    fn test_augment_appends_coefficient_records() {
        let mut set = RecordSet::new();
        set.push(Record::raw(0, &[0xF0]));
        let mut data = vec![4u8];
        data.extend_from_slice(&[0; 13]);
        let filter_id = set.push_derived(
            CMD_PRESET_DUMP,
            SUB_LAYER_FILTER,
            FLAG_HEURISTIC,
            data,
            Origin::LayerFilterHeuristic { index: 0 },
        );

        let synth = CoefficientSynthesizer::new(ModelTable::builtin(), 11).unwrap();
        let ids = synth.augment(&mut set).unwrap();

        assert_eq!(ids.len(), 1);
        let rec = set.get(ids[0]).unwrap();
        assert_eq!(rec.record_type, TYPE_COEFFICIENTS);
        assert_eq!(rec.flags, FLAG_COEFFICIENTS);
        // 4 % 3 selects the second model
        match &rec.origin {
            Origin::Coefficients {
                model,
                model_id,
                source_id,
            } => {
                assert_eq!(model, "bell_pair");
                assert_eq!(*model_id, 1);
                assert_eq!(*source_id, filter_id);
            }
            other => panic!("Expected coefficient origin, got: {:?}", other),
        }
        assert!(CoefficientBlob::decode(&rec.data).is_ok());
    }

    #[test]
    fn test_augment_skips_short_filter_records() {
        let mut set = RecordSet::new();
        set.push_derived(CMD_PRESET_DUMP, SUB_LAYER_FILTER, 0, vec![1; 13], Origin::Raw);

        let synth = CoefficientSynthesizer::new(ModelTable::builtin(), 11).unwrap();
        assert!(synth.augment(&mut set).unwrap().is_empty());
        assert_eq!(set.len(), 1);
    }
}
