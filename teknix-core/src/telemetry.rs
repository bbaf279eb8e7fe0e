use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::frame::{extract_frame, parse_frame, FieldKind, FieldSpec, FIELDS, RAW_FIELD};

/// A single typed state value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Celsius(f64),
    Raw(Vec<i64>),
}

impl FieldValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_celsius(&self) -> Option<f64> {
        match self {
            FieldValue::Celsius(c) => Some(*c),
            FieldValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Celsius(v)
    }
}

/// Named view of the device, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot(BTreeMap<String, FieldValue>);

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.0.remove(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(FieldValue::as_bool)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(FieldValue::as_int)
    }

    pub fn get_celsius(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FieldValue::as_celsius)
    }

    pub fn raw(&self) -> Option<&[i64]> {
        match self.get(RAW_FIELD) {
            Some(FieldValue::Raw(values)) => Some(values),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for StateSnapshot {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for StateSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// Integer tenths are already at one decimal place.
fn deci_to_celsius(v: i64) -> f64 {
    v as f64 / 10.0
}

/// Projects a token vector onto named fields.
///
/// Indices past the end read as zero; [`parse_frame`] already guarantees they
/// are in bounds for [`FIELDS`].
pub fn map_values(values: &[i64], fields: &[FieldSpec]) -> StateSnapshot {
    let mut snapshot = StateSnapshot::new();
    for field in fields {
        let token = values.get(field.index).copied().unwrap_or(0);
        let value = match field.kind {
            FieldKind::Flag => FieldValue::Bool(token != 0),
            FieldKind::Integer => FieldValue::Int(token),
            FieldKind::DeciCelsius => FieldValue::Celsius(deci_to_celsius(token)),
        };
        snapshot.insert(field.name, value);
    }
    snapshot.insert(RAW_FIELD, FieldValue::Raw(values.to_vec()));
    snapshot
}

/// Payload in, snapshot out. Anything that is not a valid info telegram
/// yields `None`.
pub fn decode_telemetry(payload: &str) -> Option<StateSnapshot> {
    let frame = extract_frame(payload)?;
    match parse_frame(&frame) {
        Ok(values) => Some(map_values(&values, FIELDS)),
        Err(e) => {
            tracing::trace!("dropping telegram: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::*;

    fn frame_with(set: &[(usize, i64)]) -> String {
        let mut tokens = vec![0i64; 40];
        for (idx, v) in set {
            tokens[*idx] = *v;
        }
        let body: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        format!("I{}Z", body.join("&"))
    }

    #[test]
    fn test_map_converts_each_kind() {
        let frame = frame_with(&[(0, 1), (1, 55), (8, 60), (11, 2), (18, 3), (19, 4), (38, 452), (39, -7)]);
        let snap = decode_telemetry(&frame).unwrap();

        assert_eq!(snap.get(BOILER_POWER_STATE), Some(&FieldValue::Bool(true)));
        assert_eq!(snap.get(HOUSE_TARGET_TEMP), Some(&FieldValue::Int(55)));
        assert_eq!(snap.get(TANK_TARGET_TEMP), Some(&FieldValue::Int(60)));
        assert_eq!(snap.get(HOUSE_HEATING_ACTIVE), Some(&FieldValue::Bool(true)));
        assert_eq!(snap.get(TANK_HEATING_ACTIVE), Some(&FieldValue::Bool(false)));
        assert_eq!(snap.get(HOUSE_POWER_STEP), Some(&FieldValue::Int(3)));
        assert_eq!(snap.get(TANK_POWER_STEP), Some(&FieldValue::Int(4)));
        assert_eq!(snap.get_celsius(HOUSE_LOOP_TEMP), Some(45.2));
        assert_eq!(snap.get_celsius(TANK_WATER_TEMP), Some(-0.7));
    }

    #[test]
    fn test_keys_are_index_map_plus_raw() {
        let snap = decode_telemetry(&frame_with(&[])).unwrap();
        let mut expected: Vec<&str> = FIELDS.iter().map(|f| f.name).collect();
        expected.push(RAW_FIELD);
        expected.sort();
        assert_eq!(snap.keys().collect::<Vec<_>>(), expected);
        assert_eq!(snap.raw().map(<[i64]>::len), Some(40));
    }

    #[test]
    fn test_wrapped_payload_decodes() {
        let payload = serde_json::json!({ "SerialReceived": frame_with(&[(1, 42)]) }).to_string();
        let snap = decode_telemetry(&payload).unwrap();
        assert_eq!(snap.get_int(HOUSE_TARGET_TEMP), Some(42));
    }

    #[test]
    fn test_short_vector_defaults_to_zero() {
        let snap = map_values(&[1], FIELDS);
        assert_eq!(snap.get_bool(BOILER_POWER_STATE), Some(true));
        assert_eq!(snap.get_int(TANK_POWER_STEP), Some(0));
        assert_eq!(snap.get_celsius(TANK_WATER_TEMP), Some(0.0));
    }

    #[test]
    fn test_decode_drops_garbage() {
        assert!(decode_telemetry("").is_none());
        assert!(decode_telemetry("I1&2&3Z").is_none());
        assert!(decode_telemetry("{not json").is_none());
    }

    #[test]
    fn test_snapshot_serializes_flat() {
        let snap: StateSnapshot = [("a", FieldValue::Bool(true)), ("b", FieldValue::Int(3))]
            .into_iter()
            .collect();
        assert_eq!(serde_json::to_string(&snap).unwrap(), r#"{"a":true,"b":3}"#);
    }

    #[test]
    fn test_tenths_land_on_one_decimal() {
        for v in -1000..=1000 {
            let c = deci_to_celsius(v);
            assert_eq!(format!("{c:.1}").parse::<f64>().unwrap(), c, "{v}");
        }
        assert_eq!(deci_to_celsius(655), 65.5);
    }
}
