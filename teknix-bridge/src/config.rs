use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use teknix_core::{HubSettings, SuffixEncoding};
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BridgeConfig {
    pub mqtt: MqttConf,
    pub device: DeviceConf,
    pub pending_ttl_ms: u64,
    pub poll_interval_secs: u64,
    pub http: HttpConf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DeviceConf {
    pub serial: String,
    pub model: String,
    /// Older firmware wants the house-temperature suffix in hex.
    pub legacy_hex_suffix: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConf {
    pub bind: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttConf::default(),
            device: DeviceConf::default(),
            pending_ttl_ms: 2000,
            poll_interval_secs: 60,
            http: HttpConf::default(),
        }
    }
}

impl Default for MqttConf {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            client_id: "teknix-bridge".into(),
            keep_alive_secs: 15,
        }
    }
}

impl Default for DeviceConf {
    fn default() -> Self {
        Self {
            serial: String::new(),
            model: "ESPRO 9".into(),
            legacy_hex_suffix: false,
        }
    }
}

impl Default for HttpConf {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8080".into() }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.device.serial.trim().is_empty() {
            bail!("device.serial is required");
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn hub_settings(&self) -> HubSettings {
        HubSettings {
            pending_ttl: Duration::from_millis(self.pending_ttl_ms),
            house_suffix: if self.device.legacy_hex_suffix {
                SuffixEncoding::LegacyHex
            } else {
                SuffixEncoding::Decimal
            },
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl DeviceConf {
    pub fn command_topic(&self) -> String {
        format!("cmnd/tasmota_{}/SerialSend", self.serial)
    }

    pub fn telemetry_filter(&self) -> String {
        format!("tele/tasmota_{}/#", self.serial)
    }

    pub fn is_telemetry_topic(&self, topic: &str) -> bool {
        topic
            .strip_prefix("tele/tasmota_")
            .and_then(|rest| rest.strip_prefix(self.serial.as_str()))
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

pub async fn load_config() -> Result<BridgeConfig> {
    let path = std::env::var("TEKNIX_BRIDGE_CONFIG").unwrap_or_else(|_| "teknix.yaml".into());
    load_config_from(&path).await
}

pub async fn load_config_from(path: impl AsRef<Path>) -> Result<BridgeConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!("no config at {}, using defaults", path.display());
        return Ok(BridgeConfig::default());
    }

    let txt = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    if txt.trim().is_empty() {
        return Ok(BridgeConfig::default());
    }
    serde_yaml::from_str(&txt).with_context(|| format!("invalid config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let cfg = load_config_from("/nonexistent/teknix.yaml").await.unwrap();
        assert_eq!(cfg.mqtt.port, 1883);
        assert_eq!(cfg.poll_interval(), Duration::from_secs(60));
        assert!(cfg.validate().is_err());
    }

    #[tokio::test]
    async fn test_partial_yaml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "device:\n  serial: \"A1B2\"\n  legacy_hex_suffix: true\npending_ttl_ms: 1500").unwrap();

        let cfg = load_config_from(file.path()).await.unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.device.model, "ESPRO 9");
        assert_eq!(cfg.mqtt.host, "localhost");

        let settings = cfg.hub_settings();
        assert_eq!(settings.pending_ttl, Duration::from_millis(1500));
        assert_eq!(settings.house_suffix, SuffixEncoding::LegacyHex);
    }

    #[tokio::test]
    async fn test_invalid_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mqtt: [not, a, map").unwrap();
        assert!(load_config_from(file.path()).await.is_err());
    }

    #[test]
    fn test_topics() {
        let device = DeviceConf { serial: "A1B2".into(), ..Default::default() };
        assert_eq!(device.command_topic(), "cmnd/tasmota_A1B2/SerialSend");
        assert_eq!(device.telemetry_filter(), "tele/tasmota_A1B2/#");
        assert!(device.is_telemetry_topic("tele/tasmota_A1B2/RESULT"));
        assert!(device.is_telemetry_topic("tele/tasmota_A1B2"));
        assert!(!device.is_telemetry_topic("tele/tasmota_A1B23/RESULT"));
        assert!(!device.is_telemetry_topic("stat/tasmota_A1B2/RESULT"));
    }
}
