/*!
HTTP control surface.

- `GET  /health` liveness, no key required
- `GET  /system/health` bridge counters
- `GET  /device` merged state, live overrides, computed draw
- `POST /device/power-step`, `/device/target-temp`, `/device/switch/{kind}`,
  `/device/poll` queue a command telegram

Everything except `/health` needs `x-api-key` matching `TEKNIX_API_KEY`.
*/

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use teknix_core::{Circuit, DeviceHub, HubError, HubStatus, PlannedCommand, SwitchKind};

use crate::health::{BridgeHealth, HealthTracker};
use crate::mqtt::Outbox;
use crate::state::SharedHub;

#[derive(Clone)]
pub struct AppState {
    pub hub: SharedHub,
    pub health: HealthTracker,
    pub outbox: Outbox,
}

#[derive(Debug, Deserialize)]
pub struct PowerStepRequest {
    pub target: Circuit,
    pub value: i64,
}

#[derive(Debug, Deserialize)]
pub struct TargetTempRequest {
    pub target: Circuit,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct SwitchRequest {
    pub on: bool,
}

type CommandReply = (StatusCode, Json<Value>);

async fn require_api_key(req: Request, next: Next) -> Result<Response, StatusCode> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let expected = std::env::var("TEKNIX_API_KEY").unwrap_or_default();
    if expected.is_empty() {
        tracing::warn!("TEKNIX_API_KEY not set, API access denied");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let ok = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !ok {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/device", get(get_device))
        .route("/device/power-step", post(set_power_step))
        .route("/device/target-temp", post(set_target_temp))
        .route("/device/switch/{kind}", post(set_switch))
        .route("/device/poll", post(poll))
        .with_state(app_state)
        .layer(middleware::from_fn(require_api_key))
}

/// Queues a planned command and records it on the hub only once the outbox
/// has taken it.
fn dispatch(app: &AppState, plan: impl FnOnce(&DeviceHub) -> Result<PlannedCommand, HubError>) -> CommandReply {
    let mut hub = app.hub.lock();
    let planned = match plan(&*hub) {
        Ok(planned) => planned,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "ok": false, "error": e.to_string() })),
            )
        }
    };
    if app.outbox.send(planned.telegram.clone()).is_err() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ok": false, "error": "command outbox closed" })),
        );
    }
    let cmd = hub.commit(planned, Instant::now());
    (StatusCode::OK, Json(json!({ "ok": true, "command": cmd })))
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<BridgeHealth> {
    Json(app.health.get_health())
}

// GET /device
async fn get_device(State(app): State<AppState>) -> Json<HubStatus> {
    let status = app.hub.lock().status(Instant::now());
    Json(status)
}

async fn set_power_step(State(app): State<AppState>, Json(req): Json<PowerStepRequest>) -> CommandReply {
    dispatch(&app, |hub| hub.plan_power_step(req.target, req.value))
}

async fn set_target_temp(State(app): State<AppState>, Json(req): Json<TargetTempRequest>) -> CommandReply {
    dispatch(&app, |hub| hub.plan_target_temp(req.target, req.value))
}

async fn set_switch(
    State(app): State<AppState>,
    Path(kind): Path<String>,
    Json(req): Json<SwitchRequest>,
) -> CommandReply {
    let Some(kind) = SwitchKind::parse(&kind) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "ok": false, "error": format!("unknown switch: {kind}") })),
        );
    };
    dispatch(&app, |hub| hub.plan_switch(kind, req.on))
}

// POST /device/poll
async fn poll(State(app): State<AppState>) -> CommandReply {
    dispatch(&app, |hub| hub.plan_poll())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::new_state;
    use teknix_core::frame::{BOILER_POWER_STATE, HOUSE_POWER_STEP, TANK_HEATING_ACTIVE, TANK_TARGET_TEMP};
    use teknix_core::HubSettings;
    use tokio::sync::mpsc;

    fn app() -> (AppState, mpsc::UnboundedReceiver<String>) {
        let hub = DeviceHub::new("A1B2", "ESPRO 9", HubSettings::default()).unwrap();
        let (outbox, rx) = mpsc::unbounded_channel();
        let state = AppState {
            hub: new_state(hub),
            health: HealthTracker::new(),
            outbox,
        };
        (state, rx)
    }

    #[tokio::test]
    async fn test_power_step_queues_command() {
        let (app, mut rx) = app();
        let (code, Json(body)) = set_power_step(
            State(app.clone()),
            Json(PowerStepRequest { target: Circuit::House, value: 3 }),
        )
        .await;

        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["command"], "T190320010016Z");
        assert_eq!(rx.recv().await.as_deref(), Some("T190320010016Z"));
        assert_eq!(app.hub.lock().state().get_int(HOUSE_POWER_STEP), Some(3));
    }

    #[tokio::test]
    async fn test_target_temp_and_switch() {
        let (app, mut rx) = app();

        let (code, _) = set_target_temp(
            State(app.clone()),
            Json(TargetTempRequest { target: Circuit::Tank, value: 45.0 }),
        )
        .await;
        assert_eq!(code, StatusCode::OK);

        let (code, _) = set_switch(
            State(app.clone()),
            Path("tank_heating".to_string()),
            Json(SwitchRequest { on: false }),
        )
        .await;
        assert_eq!(code, StatusCode::OK);

        assert_eq!(rx.recv().await.as_deref(), Some("T09450018Z"));
        assert_eq!(rx.recv().await.as_deref(), Some("T13000004Z"));

        let Json(status) = get_device(State(app.clone())).await;
        assert_eq!(status.state.get_int(TANK_TARGET_TEMP), Some(45));
        assert_eq!(status.state.get_bool(TANK_HEATING_ACTIVE), Some(false));
        assert_eq!(status.pending.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_switch_is_404() {
        let (app, mut rx) = app();
        let (code, _) = set_switch(State(app), Path("garage".to_string()), Json(SwitchRequest { on: true })).await;

        assert_eq!(code, StatusCode::NOT_FOUND);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalid_target_is_422() {
        let (app, _rx) = app();
        let (code, Json(body)) = set_target_temp(
            State(app),
            Json(TargetTempRequest { target: Circuit::House, value: f64::INFINITY }),
        )
        .await;

        assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn test_closed_outbox_is_503() {
        let (app, rx) = app();
        drop(rx);

        let (code, _) = poll(State(app)).await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unsent_command_leaves_hub_untouched() {
        let (app, rx) = app();
        drop(rx);

        let (code, Json(body)) = set_switch(
            State(app.clone()),
            Path("boiler_power".to_string()),
            Json(SwitchRequest { on: true }),
        )
        .await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["ok"], false);

        let hub = app.hub.lock();
        assert!(hub.pending().is_empty());
        assert_eq!(hub.state().get_bool(BOILER_POWER_STATE), None);
    }

    #[test]
    fn test_circuit_names_deserialize() {
        let req: PowerStepRequest = serde_json::from_str(r#"{"target":"tank","value":2}"#).unwrap();
        assert_eq!(req.target, Circuit::Tank);
    }
}
