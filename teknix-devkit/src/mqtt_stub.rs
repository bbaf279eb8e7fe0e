/*!
Mock MQTT client for exercising the bridge without a broker.

Records every publish and lets tests inject messages as if they came from the
Tasmota adapter.
*/

use anyhow::Result;
use rumqttc::QoS;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct MockMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

impl MockMessage {
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Stand-in for `rumqttc::AsyncClient` with the same publish/subscribe shape.
#[derive(Clone, Default)]
pub struct MockMqttClient {
    published: Arc<Mutex<Vec<MockMessage>>>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    incoming: Arc<Mutex<Option<mpsc::UnboundedSender<MockMessage>>>>,
}

impl MockMqttClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel on which [`simulate_incoming`](Self::simulate_incoming) delivers.
    pub fn setup_receiver(&self) -> mpsc::UnboundedReceiver<MockMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.incoming.lock().unwrap() = Some(tx);
        rx
    }

    pub async fn publish<S, V>(&self, topic: S, qos: QoS, retain: bool, payload: V) -> Result<()>
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        let message = MockMessage {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            retain,
        };
        log::info!("[mock] publish {} ({} bytes)", message.topic, message.payload.len());
        self.published.lock().unwrap().push(message);
        Ok(())
    }

    pub async fn subscribe<S: Into<String>>(&self, topic: S, _qos: QoS) -> Result<()> {
        let topic = topic.into();
        log::info!("[mock] subscribe {}", topic);
        self.subscriptions.lock().unwrap().push(topic);
        Ok(())
    }

    pub async fn simulate_incoming<S, V>(&self, topic: S, payload: V) -> Result<()>
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        let message = MockMessage {
            topic: topic.into(),
            payload: payload.into(),
            qos: QoS::AtMostOnce,
            retain: false,
        };
        let guard = self.incoming.lock().unwrap();
        let sender = guard
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no receiver set up"))?;
        sender
            .send(message)
            .map_err(|e| anyhow::anyhow!("incoming channel closed: {}", e))?;
        Ok(())
    }

    pub fn get_published_messages(&self) -> Vec<MockMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn get_subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    /// Payloads published on `topic`, oldest first.
    pub fn payloads_on(&self, topic: &str) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|msg| msg.topic == topic)
            .map(MockMessage::payload_str)
            .collect()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
        self.subscriptions.lock().unwrap().clear();
    }
}

/// Builds payloads the way a Tasmota serial bridge emits them.
pub struct TasmotaMessageBuilder;

impl TasmotaMessageBuilder {
    /// `{"Time": ..., "SerialReceived": "<frame>"}` as sent on `tele/.../RESULT`.
    pub fn serial_received(frame: &str) -> String {
        serde_json::json!({
            "Time": chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            "SerialReceived": frame,
        })
        .to_string()
    }

    /// Last-will payload on `tele/.../LWT`.
    pub fn lwt_online() -> &'static str {
        "Online"
    }

    /// Periodic `tele/.../STATE` report, which carries no telegram.
    pub fn state_report(uptime: &str) -> String {
        serde_json::json!({
            "Time": chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            "Uptime": uptime,
            "Wifi": { "RSSI": 70 },
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_is_recorded() {
        let client = MockMqttClient::new();
        client.subscribe("tele/tasmota_X/#", QoS::AtLeastOnce).await.unwrap();
        client
            .publish("cmnd/tasmota_X/SerialSend", QoS::AtLeastOnce, false, "INFO")
            .await
            .unwrap();

        assert_eq!(client.get_subscriptions(), vec!["tele/tasmota_X/#"]);
        assert_eq!(client.payloads_on("cmnd/tasmota_X/SerialSend"), vec!["INFO"]);
        assert!(client.payloads_on("elsewhere").is_empty());

        client.clear();
        assert!(client.get_published_messages().is_empty());
    }

    #[tokio::test]
    async fn test_simulated_incoming_reaches_receiver() {
        let client = MockMqttClient::new();
        let mut rx = client.setup_receiver();
        client.simulate_incoming("tele/tasmota_X/LWT", "Online").await.unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.topic, "tele/tasmota_X/LWT");
        assert_eq!(msg.payload_str(), "Online");
    }

    #[tokio::test]
    async fn test_simulate_without_receiver_fails() {
        let client = MockMqttClient::new();
        assert!(client.simulate_incoming("t", "p").await.is_err());
    }

    #[test]
    fn test_serial_received_shape() {
        let payload = TasmotaMessageBuilder::serial_received("I1&2Z");
        let v: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(v["SerialReceived"], "I1&2Z");
        assert!(v["Time"].is_string());
    }
}
