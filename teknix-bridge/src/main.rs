/*!
Teknix bridge.

Subscribes to a Tasmota serial bridge's telemetry, keeps one controller's state
reconciled against locally issued commands, polls it with `INFO`, and exposes
state and controls over HTTP.
*/

mod config;
mod health;
mod http;
mod mqtt;
mod state;

use anyhow::{Context, Result};
use teknix_core::DeviceHub;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::health::HealthTracker;
use crate::http::AppState;
use crate::state::new_state;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = config::load_config().await?;
    cfg.validate()?;

    let hub = DeviceHub::new(&cfg.device.serial, &cfg.device.model, cfg.hub_settings())
        .context("building device hub")?;
    info!("bridging {} ({})", cfg.device.serial, hub.model().name);
    let hub = new_state(hub);
    let health = HealthTracker::new();

    let (client, eventloop) = mqtt::connect(&cfg.mqtt);
    let (outbox, outbox_rx) = mpsc::unbounded_channel();

    tokio::spawn(mqtt::run_outbox(
        client.clone(),
        cfg.device.command_topic(),
        outbox_rx,
        health.clone(),
    ));
    mqtt::spawn_listener(client, eventloop, hub.clone(), health.clone(), cfg.device.clone());
    mqtt::spawn_poller(hub.clone(), outbox.clone(), cfg.poll_interval());

    let app = http::build_router(AppState { hub, health, outbox });
    let listener = TcpListener::bind(&cfg.http.bind)
        .await
        .with_context(|| format!("binding {}", cfg.http.bind))?;
    info!("listening on http://{}", cfg.http.bind);
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
