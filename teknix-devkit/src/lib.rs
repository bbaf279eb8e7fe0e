/*!
# Teknix DevKit

Test support for the bridge:
- mock MQTT client that records publishes and injects telemetry
- telegram builders addressing fields by name
- a harness bundling both for one device serial
*/

pub mod mqtt_stub;
pub mod telegram;
pub mod test_utils;

pub use mqtt_stub::{MockMessage, MockMqttClient, TasmotaMessageBuilder};
pub use telegram::TelegramBuilder;
pub use test_utils::TestHarness;
