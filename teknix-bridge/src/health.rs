use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Serialize)]
pub struct BridgeHealth {
    pub started_at: String,
    pub uptime_seconds: u64,
    pub mqtt_status: String,
    pub mqtt_reconnects: u64,
    pub frames_accepted: u64,
    pub payloads_ignored: u64,
    pub commands_sent: u64,
    pub command_failures: u64,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    started_at: OffsetDateTime,
    mqtt_status: Arc<parking_lot::Mutex<String>>,
    mqtt_reconnects: Arc<AtomicU64>,
    frames_accepted: Arc<AtomicU64>,
    payloads_ignored: Arc<AtomicU64>,
    commands_sent: Arc<AtomicU64>,
    command_failures: Arc<AtomicU64>,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            started_at: OffsetDateTime::now_utc(),
            mqtt_status: Arc::new(parking_lot::Mutex::new("connecting".to_string())),
            mqtt_reconnects: Arc::new(AtomicU64::new(0)),
            frames_accepted: Arc::new(AtomicU64::new(0)),
            payloads_ignored: Arc::new(AtomicU64::new(0)),
            commands_sent: Arc::new(AtomicU64::new(0)),
            command_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn mark_mqtt_connected(&self) {
        *self.mqtt_status.lock() = "connected".to_string();
    }

    pub fn increment_reconnects(&self) {
        self.mqtt_reconnects.fetch_add(1, Ordering::Relaxed);
        *self.mqtt_status.lock() = "reconnecting".to_string();
    }

    pub fn record_frame(&self, accepted: bool) {
        let counter = if accepted { &self.frames_accepted } else { &self.payloads_ignored };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command(&self, sent: bool) {
        let counter = if sent { &self.commands_sent } else { &self.command_failures };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_health(&self) -> BridgeHealth {
        BridgeHealth {
            started_at: self.started_at.format(&Rfc3339).unwrap_or_default(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            mqtt_status: self.mqtt_status.lock().clone(),
            mqtt_reconnects: self.mqtt_reconnects.load(Ordering::Relaxed),
            frames_accepted: self.frames_accepted.load(Ordering::Relaxed),
            payloads_ignored: self.payloads_ignored.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            command_failures: self.command_failures.load(Ordering::Relaxed),
        }
    }
}
