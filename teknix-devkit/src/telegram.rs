//! Info telegram fixtures built by field name.

use teknix_core::frame::{field_index, FIELDS, FIELD_DELIMITER, FRAME_PREFIX, FRAME_SUFFIX};

use crate::mqtt_stub::TasmotaMessageBuilder;

/// Builds `I...Z` frames with every token zero unless set.
#[derive(Debug, Clone)]
pub struct TelegramBuilder {
    tokens: Vec<i64>,
}

impl Default for TelegramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelegramBuilder {
    /// Shortest frame the decoder accepts.
    pub fn new() -> Self {
        let len = FIELDS.iter().map(|f| f.index).max().unwrap_or(0) + 1;
        Self::with_len(len)
    }

    pub fn with_len(len: usize) -> Self {
        Self { tokens: vec![0; len] }
    }

    /// Sets a named field's raw token. Panics on an unknown name.
    pub fn set(self, field: &str, token: i64) -> Self {
        let index = field_index(field).unwrap_or_else(|| panic!("unknown telegram field: {field}"));
        self.set_index(index, token)
    }

    pub fn flag(self, field: &str, on: bool) -> Self {
        self.set(field, i64::from(on))
    }

    /// Stores a temperature the way the device does, in tenths of a degree.
    pub fn celsius(self, field: &str, degrees: f64) -> Self {
        self.set(field, (degrees * 10.0).round() as i64)
    }

    pub fn set_index(mut self, index: usize, token: i64) -> Self {
        if index >= self.tokens.len() {
            self.tokens.resize(index + 1, 0);
        }
        self.tokens[index] = token;
        self
    }

    pub fn build(&self) -> String {
        let delimiter = FIELD_DELIMITER.to_string();
        let body: Vec<String> = self.tokens.iter().map(i64::to_string).collect();
        format!("{FRAME_PREFIX}{}{FRAME_SUFFIX}", body.join(delimiter.as_str()))
    }

    /// The frame wrapped in a Tasmota `SerialReceived` message.
    pub fn serial_received(&self) -> String {
        TasmotaMessageBuilder::serial_received(&self.build())
    }
}
