//! Message canonicalization
//!
//! Matches a frame core against a [`DeviceSpec`] and splits it into a uniform
//! (command, subtype, data, checksum) view.

use super::device::{ChecksumKind, DeviceSpec};

/// Commands whose first data byte is a subtype selector
pub const SUBTYPED_COMMANDS: [u8; 6] = [0x10, 0x11, 0x18, 0x1A, 0x1B, 0x61];

/// Trailer value meaning "checksum not supplied"
pub const CHECKSUM_IGNORE: u8 = 0x7F;

/// Result of checksum verification for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumStatus {
    /// Trailer matches the computed checksum
    Valid,
    /// Trailer does not match
    Invalid { declared: u8, computed: u8 },
    /// Trailer holds the ignore sentinel
    Ignored,
    /// The device does not define a checksum, or there is no trailer
    Unchecked,
}

impl ChecksumStatus {
    /// Only an explicit mismatch counts as invalid
    pub fn is_valid(&self) -> bool {
        !matches!(self, ChecksumStatus::Invalid { .. })
    }
}

/// One frame decoded against a device specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMessage {
    pub family: u8,
    pub device_id: u8,
    pub editor: u8,
    pub command: u8,
    pub subtype: Option<u8>,
    /// Everything after the command byte, subtype and checksum included
    pub data: Vec<u8>,
    pub checksum: ChecksumStatus,
}

/// 7-bit ones' complement checksum over `data`
pub fn ones_complement_7bit(data: &[u8]) -> u8 {
    let sum = data
        .iter()
        .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b & 0x7F)));
    (!(sum as u8)) & 0x7F
}

/// Decode `core` (frame body without delimiters) against `spec`.
///
/// Returns `None` when the message does not belong to the device. A checksum
/// mismatch never rejects the message; it is reported in
/// [`CanonicalMessage::checksum`].
pub fn canonicalize(core: &[u8], spec: &DeviceSpec) -> Option<CanonicalMessage> {
    let prefix = spec.manufacturer_id.as_slice();
    if core.len() < prefix.len() + 4 || !core.starts_with(prefix) {
        return None;
    }

    let off = prefix.len();
    let (family, device_id, editor, command) =
        (core[off], core[off + 1], core[off + 2], core[off + 3]);
    if family != spec.family_id || editor != spec.editor {
        return None;
    }

    let data = core[off + 4..].to_vec();
    let subtype = if SUBTYPED_COMMANDS.contains(&command) {
        data.first().copied()
    } else {
        None
    };
    let checksum = verify_checksum(&data, spec.checksum.kind);

    Some(CanonicalMessage {
        family,
        device_id,
        editor,
        command,
        subtype,
        data,
        checksum,
    })
}

fn verify_checksum(data: &[u8], kind: ChecksumKind) -> ChecksumStatus {
    let Some((&trailer, body)) = data.split_last() else {
        return ChecksumStatus::Unchecked;
    };
    match kind {
        ChecksumKind::None => ChecksumStatus::Unchecked,
        ChecksumKind::OnesComplement7Bit => {
            let declared = trailer & 0x7F;
            if declared == CHECKSUM_IGNORE {
                return ChecksumStatus::Ignored;
            }
            let computed = ones_complement_7bit(body);
            if computed == declared {
                ChecksumStatus::Valid
            } else {
                ChecksumStatus::Invalid { declared, computed }
            }
        }
    }
}
