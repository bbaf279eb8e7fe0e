use thiserror::Error;

/// Why a telegram frame was rejected.
///
/// Callers on the telemetry path collapse all of these into "no update";
/// the variants only exist so diagnostics and tests can tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("frame must start with 'I' and end with 'Z'")]
    InvalidMarkers,
    #[error("non-integer token in frame: {0:?}")]
    NonIntegerToken(String),
    #[error("field index map is empty")]
    EmptyIndexMap,
    #[error("frame too short: {len} tokens, index {max_index} required")]
    TooShort { len: usize, max_index: usize },
}

/// An outgoing command was asked to carry a value the device must never see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be in range 1..=6, got {value}")]
    StepOutOfRange { field: &'static str, value: i64 },
    #[error("temperature must be in range 30..=80 °C, got {value}")]
    TemperatureOutOfRange { value: i64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HubError {
    #[error("unknown device model: {0}")]
    UnknownModel(String),
    #[error("target value is not a finite number: {0}")]
    NotFinite(f64),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
