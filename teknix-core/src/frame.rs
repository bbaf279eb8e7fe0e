//! Telegram framing.
//!
//! The controller speaks `I<int>&<int>&...&<int>Z` over its serial line. The
//! Tasmota adapter forwards it either bare or wrapped in a JSON object under
//! `SerialReceived`.

use crate::error::ParseError;

pub const FRAME_PREFIX: char = 'I';
pub const FRAME_SUFFIX: char = 'Z';
pub const FIELD_DELIMITER: char = '&';
pub const SERIAL_KEY: &str = "SerialReceived";

/// How a token is turned into a state value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Nonzero means true.
    Flag,
    Integer,
    /// Tenths of a degree Celsius.
    DeciCelsius,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub index: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, index: usize, kind: FieldKind) -> Self {
        Self { name, index, kind }
    }
}

pub const BOILER_POWER_STATE: &str = "boiler_power_state";
pub const HOUSE_TARGET_TEMP: &str = "house_target_temp";
pub const TANK_TARGET_TEMP: &str = "tank_target_temp";
pub const HOUSE_HEATING_ACTIVE: &str = "house_heating_active";
pub const TANK_HEATING_ACTIVE: &str = "tank_heating_active";
pub const HOUSE_POWER_STEP: &str = "house_power_step";
pub const TANK_POWER_STEP: &str = "tank_power_step";
pub const HOUSE_LOOP_TEMP: &str = "house_loop_temp";
pub const TANK_WATER_TEMP: &str = "tank_water_temp";
pub const RAW_FIELD: &str = "raw";

/// Token positions of the info telegram.
pub const FIELDS: &[FieldSpec] = &[
    FieldSpec::new(BOILER_POWER_STATE, 0, FieldKind::Flag),
    FieldSpec::new(HOUSE_TARGET_TEMP, 1, FieldKind::Integer),
    FieldSpec::new(TANK_TARGET_TEMP, 8, FieldKind::Integer),
    FieldSpec::new(HOUSE_HEATING_ACTIVE, 11, FieldKind::Flag),
    FieldSpec::new(TANK_HEATING_ACTIVE, 12, FieldKind::Flag),
    FieldSpec::new(HOUSE_POWER_STEP, 18, FieldKind::Integer),
    FieldSpec::new(TANK_POWER_STEP, 19, FieldKind::Integer),
    FieldSpec::new(HOUSE_LOOP_TEMP, 38, FieldKind::DeciCelsius),
    FieldSpec::new(TANK_WATER_TEMP, 39, FieldKind::DeciCelsius),
];

/// Position of a named field in [`FIELDS`].
pub fn field_index(name: &str) -> Option<usize> {
    FIELDS.iter().find(|f| f.name == name).map(|f| f.index)
}

fn has_markers(candidate: &str) -> bool {
    candidate.starts_with(FRAME_PREFIX) && candidate.ends_with(FRAME_SUFFIX)
}

/// Pulls the raw telegram out of an MQTT payload.
///
/// Returns `None` for anything that is not a frame: empty payloads, non-JSON
/// text, JSON without a string `SerialReceived`, or a candidate with the wrong
/// markers.
pub fn extract_frame(payload: &str) -> Option<String> {
    let p = payload.trim();
    if p.is_empty() {
        return None;
    }
    if has_markers(p) {
        return Some(p.to_string());
    }

    let obj: serde_json::Value = serde_json::from_str(p).ok()?;
    let frame = obj.as_object()?.get(SERIAL_KEY)?.as_str()?;
    has_markers(frame).then(|| frame.to_string())
}

/// Splits a telegram into its integer tokens, checked against [`FIELDS`].
pub fn parse_frame(frame: &str) -> Result<Vec<i64>, ParseError> {
    parse_frame_with(frame, FIELDS)
}

pub fn parse_frame_with(frame: &str, fields: &[FieldSpec]) -> Result<Vec<i64>, ParseError> {
    if frame.len() < 2 || !has_markers(frame) {
        return Err(ParseError::InvalidMarkers);
    }

    let body = &frame[FRAME_PREFIX.len_utf8()..frame.len() - FRAME_SUFFIX.len_utf8()];
    let values = body
        .split(FIELD_DELIMITER)
        .map(|token| {
            token
                .trim()
                .parse::<i64>()
                .map_err(|_| ParseError::NonIntegerToken(token.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let max_index = fields
        .iter()
        .map(|f| f.index)
        .max()
        .ok_or(ParseError::EmptyIndexMap)?;
    if values.len() <= max_index {
        return Err(ParseError::TooShort { len: values.len(), max_index });
    }

    Ok(values)
}
