use anyhow::{Context, Result};
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use std::future::Future;
use std::time::{Duration, Instant};
use teknix_core::ReconcileReport;
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::{DeviceConf, MqttConf};
use crate::health::HealthTracker;
use crate::state::SharedHub;

/// Command telegrams waiting to be published on the device's command topic.
pub type Outbox = mpsc::UnboundedSender<String>;

/// Where command telegrams go. Fire-and-forget: the only acknowledgement is a
/// later telemetry frame.
pub trait CommandBus {
    fn send_command(&self, topic: &str, payload: String) -> impl Future<Output = Result<()>> + Send;
}

impl CommandBus for AsyncClient {
    fn send_command(&self, topic: &str, payload: String) -> impl Future<Output = Result<()>> + Send {
        let topic = topic.to_string();
        async move {
            self.publish(topic, QoS::AtLeastOnce, false, payload)
                .await
                .context("publishing command")
        }
    }
}

pub fn connect(cfg: &MqttConf) -> (AsyncClient, EventLoop) {
    let mut opts = MqttOptions::new(&cfg.client_id, &cfg.host, cfg.port);
    opts.set_keep_alive(Duration::from_secs(cfg.keep_alive_secs));
    opts.set_clean_session(true);
    AsyncClient::new(opts, 10)
}

/// Runs one incoming publish through the hub. Returns the reconciliation
/// report when the payload carried a valid telegram.
pub fn handle_publish(
    hub: &SharedHub,
    health: &HealthTracker,
    device: &DeviceConf,
    topic: &str,
    payload: &[u8],
) -> Option<ReconcileReport> {
    if !device.is_telemetry_topic(topic) {
        return None;
    }

    let text = String::from_utf8_lossy(payload);
    let report = hub.lock().ingest(&text, Instant::now());
    health.record_frame(report.is_some());
    if let Some(r) = &report {
        debug!(
            topic,
            accepted = r.accepted.len(),
            ignored = ?r.ignored,
            confirmed = ?r.confirmed,
            "telegram merged"
        );
    }
    report
}

pub fn spawn_listener(
    client: AsyncClient,
    mut eventloop: EventLoop,
    hub: SharedHub,
    health: HealthTracker,
    device: DeviceConf,
) -> JoinHandle<()> {
    task::spawn(async move {
        let filter = device.telemetry_filter();
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    health.mark_mqtt_connected();
                    // Clean sessions forget subscriptions, so renew on every connect.
                    match client.try_subscribe(filter.as_str(), QoS::AtLeastOnce) {
                        Ok(()) => info!("subscribed to {filter}"),
                        Err(e) => warn!("subscribe to {filter} failed: {e}"),
                    }
                }
                Ok(Event::Incoming(Incoming::Publish(p))) => {
                    handle_publish(&hub, &health, &device, &p.topic, &p.payload);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("MQTT error: {e}");
                    health.increment_reconnects();
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    })
}

/// Drains the outbox onto the bus until every sender is gone.
pub async fn run_outbox<B: CommandBus>(
    bus: B,
    topic: String,
    mut rx: mpsc::UnboundedReceiver<String>,
    health: HealthTracker,
) {
    while let Some(cmd) = rx.recv().await {
        match bus.send_command(&topic, cmd.clone()).await {
            Ok(()) => {
                health.record_command(true);
                debug!("sent {cmd} on {topic}");
            }
            Err(e) => {
                health.record_command(false);
                warn!("command {cmd} not sent: {e:#}");
            }
        }
    }
    debug!("outbox closed");
}

/// Asks the device for a fresh info telegram every `every`, starting now.
pub fn spawn_poller(hub: SharedHub, outbox: Outbox, every: Duration) -> JoinHandle<()> {
    task::spawn(async move {
        let mut timer = tokio::time::interval(every);
        loop {
            timer.tick().await;
            let cmd = hub.lock().poll_command();
            if outbox.send(cmd.to_string()).is_err() {
                break;
            }
        }
    })
}
