//! Fleet selection helpers shared by providers and the orchestrator.
//!
//! Kept small on purpose: the reserved-name rule and log-safe formatting.

use crate::InstanceRecord;

/// Display name of the instance that must never be power-cycled.
pub const DEFAULT_RESERVED_INSTANCE_NAME: &str = "AutoDLKeeper";

/// Resolve the reserved name from an optional override.
///
/// - Trims whitespace
/// - Empty or missing input falls back to the default name
pub fn parse_reserved_name(raw: Option<&str>) -> String {
    raw.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_RESERVED_INSTANCE_NAME)
        .to_string()
}

/// Return true if the instance takes part in the power cycle.
///
/// Rules:
/// - uuid must be non-empty
/// - name must differ from `reserved_name` (exact, case-sensitive)
pub fn is_cyclable(instance: &InstanceRecord, reserved_name: &str) -> bool {
    !instance.uuid.is_empty() && instance.name != reserved_name
}

/// Uuids to cycle, in listing order, plus the number of entries left out.
pub fn cyclable_uuids(list: &[InstanceRecord], reserved_name: &str) -> (Vec<String>, usize) {
    let uuids: Vec<String> = list
        .iter()
        .filter(|i| is_cyclable(i, reserved_name))
        .map(|i| i.uuid.clone())
        .collect();
    let excluded = list.len() - uuids.len();
    (uuids, excluded)
}

/// Mask the middle of a phone number for logs: `13812345678` -> `138****5678`.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() < 8 {
        return "****".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}
