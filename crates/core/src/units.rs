//! Conversions from scheduler-native resource strings to canonical units.

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Largest value an SQL integer column holds.
const MAX_STORED: u64 = i64::MAX as u64;

const MEMORY_SUFFIXES: &[(&str, u64)] = &[("kb", KIB), ("mb", MIB), ("gb", GIB), ("b", 1)];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitFormatError {
    #[error("invalid memory value '{0}'")]
    Memory(String),
    #[error("invalid duration value '{0}'")]
    Duration(String),
    #[error("invalid integer value '{0}'")]
    Integer(String),
}

fn parse_digits(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Converts `2000mb`, `26312kb`, `1gb`, `512b` or a bare byte count to bytes.
/// Results above `i64::MAX` are rejected.
pub fn to_bytes(value: &str) -> Result<u64, UnitFormatError> {
    let (digits, multiplier) = MEMORY_SUFFIXES
        .iter()
        .find_map(|(suffix, multiplier)| {
            value
                .strip_suffix(suffix)
                .map(|digits| (digits, *multiplier))
        })
        .unwrap_or((value, 1));
    parse_digits(digits)
        .and_then(|amount| amount.checked_mul(multiplier))
        .filter(|bytes| *bytes <= MAX_STORED)
        .ok_or_else(|| UnitFormatError::Memory(value.to_string()))
}

/// Converts `H:MM:SS` to seconds. Hours are unbounded up to `i64::MAX` seconds.
pub fn to_seconds(value: &str) -> Result<u64, UnitFormatError> {
    let invalid = || UnitFormatError::Duration(value.to_string());
    let segments = value
        .split(':')
        .map(parse_digits)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(invalid)?;
    let &[hours, minutes, seconds] = segments.as_slice() else {
        return Err(invalid());
    };
    hours
        .checked_mul(3600)
        .zip(minutes.checked_mul(60))
        .and_then(|(hours, minutes)| hours.checked_add(minutes))
        .and_then(|total| total.checked_add(seconds))
        .filter(|total| *total <= MAX_STORED)
        .ok_or_else(invalid)
}

/// Parses epoch timestamps and exit codes.
pub fn to_integer(value: &str) -> Result<i64, UnitFormatError> {
    value
        .parse()
        .map_err(|_| UnitFormatError::Integer(value.to_string()))
}
