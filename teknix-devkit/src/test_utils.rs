/*!
Test harness for one simulated Tasmota-bridged controller.

Knows the device's topics, feeds telegrams in through the mock client and reads
back the command telegrams the bridge published.
*/

use crate::mqtt_stub::{MockMessage, MockMqttClient};
use crate::telegram::TelegramBuilder;
use anyhow::Result;
use tokio::sync::mpsc;

pub struct TestHarness {
    pub mqtt_client: MockMqttClient,
    pub serial: String,
    incoming: mpsc::UnboundedReceiver<MockMessage>,
}

impl TestHarness {
    pub fn new(serial: &str) -> Self {
        env_logger::try_init().ok();

        let mqtt_client = MockMqttClient::new();
        let incoming = mqtt_client.setup_receiver();
        Self {
            mqtt_client,
            serial: serial.to_string(),
            incoming,
        }
    }

    pub fn command_topic(&self) -> String {
        format!("cmnd/tasmota_{}/SerialSend", self.serial)
    }

    pub fn tele_topic(&self, leaf: &str) -> String {
        format!("tele/tasmota_{}/{}", self.serial, leaf)
    }

    /// Queues a telegram on `tele/.../RESULT`, wrapped as Tasmota does.
    pub async fn send_telegram(&self, telegram: &TelegramBuilder) -> Result<()> {
        let topic = self.tele_topic("RESULT");
        self.mqtt_client
            .simulate_incoming(topic, telegram.serial_received())
            .await?;
        log::info!("[harness] telegram sent for {}", self.serial);
        Ok(())
    }

    pub async fn send_raw(&self, leaf: &str, payload: &str) -> Result<()> {
        let topic = self.tele_topic(leaf);
        self.mqtt_client.simulate_incoming(topic, payload).await
    }

    /// Next message injected with `send_*`, if any is queued.
    pub fn next_incoming(&mut self) -> Option<MockMessage> {
        self.incoming.try_recv().ok()
    }

    /// Command telegrams published for this device, oldest first.
    pub fn commands_sent(&self) -> Vec<String> {
        self.mqtt_client.payloads_on(&self.command_topic())
    }

    pub fn assert_commands(&self, expected: &[&str]) -> Result<()> {
        let sent = self.commands_sent();
        if sent != expected {
            anyhow::bail!("expected commands {:?}, got {:?}", expected, sent);
        }
        Ok(())
    }
}
