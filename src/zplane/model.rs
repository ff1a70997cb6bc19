//! Pole models and the model table

use std::f32::consts::PI;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZpackError};

/// Second-order sections per frame
pub const SECTION_COUNT: usize = 6;

/// One complex-conjugate pole pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pole {
    /// Radius, inside the unit circle
    pub r: f32,
    /// Angle in radians, in (-π, π]
    pub theta: f32,
}

impl Pole {
    pub const fn new(r: f32, theta: f32) -> Self {
        Self { r, theta }
    }
}

/// Named pair of six-section filter shapes
#[derive(Debug, Clone, PartialEq)]
pub struct PoleModel {
    pub name: String,
    pub id: u16,
    pub frame_a: [Pole; SECTION_COUNT],
    pub frame_b: [Pole; SECTION_COUNT],
}

impl PoleModel {
    fn from_shapes(name: &str, id: u16, a: [(f32, f32); 6], b: [(f32, f32); 6]) -> Self {
        Self {
            name: name.to_string(),
            id,
            frame_a: a.map(|(r, theta)| Pole::new(r, theta)),
            frame_b: b.map(|(r, theta)| Pole::new(r, theta)),
        }
    }

    /// Every pole must lie strictly inside the unit circle with a wrapped angle
    pub fn validate(&self) -> Result<()> {
        for (frame, poles) in [("frameA", &self.frame_a), ("frameB", &self.frame_b)] {
            for (i, pole) in poles.iter().enumerate() {
                if !(pole.r > 0.0 && pole.r < 1.0) {
                    return Err(self.invalid(format!(
                        "{} pole {} radius {} outside (0, 1)",
                        frame, i, pole.r
                    )));
                }
                if !(pole.theta > -PI && pole.theta <= PI) {
                    return Err(self.invalid(format!(
                        "{} pole {} angle {} outside (-pi, pi]",
                        frame, i, pole.theta
                    )));
                }
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> ZpackError {
        ZpackError::InvalidPoleModel {
            name: self.name.clone(),
            reason,
        }
    }
}

#[derive(Deserialize)]
struct FrameFile {
    poles: Vec<Pole>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelFile {
    id: u16,
    frame_a: FrameFile,
    frame_b: FrameFile,
}

#[derive(Deserialize)]
struct TableFile {
    models: std::collections::BTreeMap<String, ModelFile>,
}

fn six_poles(name: &str, frame: &str, poles: Vec<Pole>) -> Result<[Pole; SECTION_COUNT]> {
    let len = poles.len();
    poles.try_into().map_err(|_| ZpackError::InvalidPoleModel {
        name: name.to_string(),
        reason: format!("{} has {} poles, expected {}", frame, len, SECTION_COUNT),
    })
}

/// Ordered set of pole models, sorted by model id
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTable {
    models: Vec<PoleModel>,
}

impl ModelTable {
    /// Build a table from models, validating each one
    pub fn new(mut models: Vec<PoleModel>) -> Result<Self> {
        for model in &models {
            model.validate()?;
        }
        models.sort_by_key(|m| m.id);
        Ok(Self { models })
    }

    /// Built-in morph pairs referenced to 48 kHz
    pub fn builtin() -> Self {
        let models = vec![
            PoleModel::from_shapes(
                "vowel_pair",
                0,
                [
                    (0.95, 0.010_471_976),
                    (0.96, 0.019_634_954),
                    (0.985, 0.039_269_908),
                    (0.992, 0.117_809_725),
                    (0.993, 0.327_249_23),
                    (0.985, 0.458_148_93),
                ],
                [
                    (0.96, 0.007_853_982),
                    (0.98, 0.031_415_926),
                    (0.985, 0.044_505_896),
                    (0.992, 0.130_899_69),
                    (0.99, 0.287_979_33),
                    (0.985, 0.392_699_08),
                ],
            ),
            PoleModel::from_shapes(
                "bell_pair",
                1,
                [
                    (0.996, 0.143_989_66),
                    (0.995, 0.183_259_57),
                    (0.994, 0.287_979_33),
                    (0.993, 0.392_699_08),
                    (0.992, 0.549_778_7),
                    (0.990, 0.785_398_16),
                ],
                [
                    (0.997, 0.523_598_8),
                    (0.996, 0.628_318_5),
                    (0.995, 0.706_858_35),
                    (0.993, 0.942_477_8),
                    (0.991, 1.099_557_4),
                    (0.989, 1.256_637_1),
                ],
            ),
            PoleModel::from_shapes(
                "low_pair",
                2,
                [
                    (0.88, 0.003_926_991),
                    (0.90, 0.007_853_982),
                    (0.92, 0.015_707_963),
                    (0.94, 0.032_724_924),
                    (0.96, 0.065_449_85),
                    (0.97, 0.130_899_69),
                ],
                [
                    (0.97, 0.026_179_94),
                    (0.985, 0.065_449_85),
                    (0.99, 0.157_079_63),
                    (0.992, 0.235_619_45),
                    (0.99, 0.366_519_14),
                    (0.988, 0.471_238_9),
                ],
            ),
        ];
        Self { models }
    }

    /// Parse a `{ "models": { name: { id, frameA, frameB } } }` document
    pub fn from_json(text: &str) -> Result<Self> {
        let file: TableFile = serde_json::from_str(text)?;
        let models = file
            .models
            .into_iter()
            .map(|(name, m)| -> Result<PoleModel> {
                Ok(PoleModel {
                    frame_a: six_poles(&name, "frameA", m.frame_a.poles)?,
                    frame_b: six_poles(&name, "frameB", m.frame_b.poles)?,
                    id: m.id,
                    name,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(models)
    }

    /// Load a model table from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ZpackError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    pub fn models(&self) -> &[PoleModel] {
        &self.models
    }

    /// Model at a table position (ordered by id)
    pub fn by_index(&self, index: usize) -> Option<&PoleModel> {
        self.models.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&PoleModel> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for ModelTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_valid() {
        let table = ModelTable::builtin();
        assert_eq!(table.len(), 3);
        for model in table.models() {
            model.validate().unwrap();
        }
        assert_eq!(table.by_index(1).unwrap().name, "bell_pair");
        assert_eq!(table.by_name("low_pair").unwrap().id, 2);
    }

    #[test]
    fn test_load_table_from_json() {
        let pole = r#"{"r": 0.9, "theta": 0.1}"#;
        let poles = vec![pole; 6].join(",");
        let json = format!(
            r#"{{ "models": {{
                "b_model": {{ "id": 7, "frameA": {{ "poles": [{p}] }}, "frameB": {{ "poles": [{p}] }} }},
                "a_model": {{ "id": 3, "frameA": {{ "poles": [{p}] }}, "frameB": {{ "poles": [{p}] }} }}
            }} }}"#,
            p = poles
        );
        let table = ModelTable::from_json(&json).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.by_index(0).unwrap().name, "a_model");
        assert_eq!(table.by_index(1).unwrap().id, 7);
    }

    #[test]
    fn test_rejects_wrong_pole_count() {
        let json = r#"{ "models": { "m": { "id": 0,
            "frameA": { "poles": [{"r": 0.9, "theta": 0.1}] },
            "frameB": { "poles": [] } } } }"#;
        let err = ModelTable::from_json(json).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_POLE_MODEL");
    }

    #[test]
    fn test_rejects_unstable_radius() {
        let mut model = ModelTable::builtin().by_index(0).unwrap().clone();
        model.frame_b[2].r = 1.0;
        assert!(model.validate().is_err());
        assert!(ModelTable::new(vec![model]).is_err());
    }
}
