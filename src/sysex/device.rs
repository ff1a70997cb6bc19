//! Device specification
//!
//! Identifies which frames belong to a device family and how their checksum
//! is computed. Loaded from JSON or taken from a built-in preset.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZpackError};

/// Checksum scheme applied to the message data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChecksumKind {
    /// Ones' complement of the 7-bit sum of all data bytes but the last
    #[serde(rename = "ones_complement_7bit")]
    OnesComplement7Bit,
    /// No checksum verification
    #[default]
    #[serde(rename = "none", other)]
    None,
}

/// Checksum section of the device specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChecksumSpec {
    #[serde(rename = "type", default)]
    pub kind: ChecksumKind,
}

/// Manufacturer, family and editor identifiers of a device family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSpec {
    /// Manufacturer id prefix (one or three bytes)
    pub manufacturer_id: Vec<u8>,
    /// Product family byte following the manufacturer id
    pub family_id: u8,
    /// Editor byte following the device id
    pub editor: u8,
    #[serde(default)]
    pub checksum: ChecksumSpec,
    /// Frame cores are group-packed and must be unpacked before matching
    #[serde(default, rename = "packed7bit")]
    pub packed_7bit: bool,
}

impl DeviceSpec {
    /// E-mu Proteus family (manufacturer 0x18, family 0x0F, editor 0x55)
    pub fn emu_proteus() -> Self {
        Self {
            manufacturer_id: vec![0x18],
            family_id: 0x0F,
            editor: 0x55,
            checksum: ChecksumSpec {
                kind: ChecksumKind::OnesComplement7Bit,
            },
            packed_7bit: false,
        }
    }

    /// Look up a built-in device preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "proteus" | "emu-proteus" => Some(Self::emu_proteus()),
            _ => None,
        }
    }

    /// Parse a device specification from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let spec: DeviceSpec = serde_json::from_str(text)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Load a device specification from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ZpackError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Identifier bytes must be 7-bit data bytes and the manufacturer id non-empty
    pub fn validate(&self) -> Result<()> {
        if self.manufacturer_id.is_empty() {
            return Err(ZpackError::InvalidDeviceSpec {
                reason: "manufacturerId must not be empty".to_string(),
            });
        }
        let mut ids = self
            .manufacturer_id
            .iter()
            .chain([&self.family_id, &self.editor]);
        if let Some(b) = ids.find(|&&b| b > 0x7F) {
            return Err(ZpackError::InvalidDeviceSpec {
                reason: format!("identifier byte 0x{:02X} is not a 7-bit value", b),
            });
        }
        Ok(())
    }
}
