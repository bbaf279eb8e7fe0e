//! One controller's state, owned in one place.
//!
//! Telemetry and user intents both funnel through [`DeviceHub`]. It is not
//! internally synchronised: hosts with more than one producer keep it behind a
//! single mutex held for one call.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::commands::{Command, SuffixEncoding, SwitchKind, INFO_COMMAND, STEP_MIN, TEMP_MAX_C, TEMP_MIN_C};
use crate::error::HubError;
use crate::frame::{HOUSE_POWER_STEP, HOUSE_TARGET_TEMP, TANK_POWER_STEP, TANK_TARGET_TEMP};
use crate::models::ModelSpec;
use crate::pending::{PendingOverrideStore, DEFAULT_PENDING_TTL};
use crate::reconcile::{reconcile, ReconcileReport};
use crate::telemetry::{decode_telemetry, FieldValue, StateSnapshot};

/// Which heating circuit a step or temperature applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Circuit {
    House,
    Tank,
}

impl Circuit {
    pub fn target_key(self) -> &'static str {
        match self {
            Circuit::House => HOUSE_TARGET_TEMP,
            Circuit::Tank => TANK_TARGET_TEMP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubSettings {
    pub pending_ttl: Duration,
    pub house_suffix: SuffixEncoding,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            pending_ttl: DEFAULT_PENDING_TTL,
            house_suffix: SuffixEncoding::Decimal,
        }
    }
}

/// Read-only view handed to API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct HubStatus {
    pub serial: String,
    pub model: &'static str,
    pub available: bool,
    pub state: StateSnapshot,
    pub pending: Vec<String>,
    pub current_consumption_kw: f64,
    pub max_step: i64,
    pub seconds_since_update: Option<u64>,
}

/// An encoded command together with the state it will claim once sent.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCommand {
    pub command: Command,
    pub telegram: String,
    overrides: Vec<(&'static str, FieldValue)>,
    shown: Option<(&'static str, FieldValue)>,
}

impl PlannedCommand {
    fn encode(
        command: Command,
        overrides: Vec<(&'static str, FieldValue)>,
        shown: Option<(&'static str, FieldValue)>,
    ) -> Result<Self, HubError> {
        let telegram = command.encode()?;
        Ok(Self { command, telegram, overrides, shown })
    }

    /// State keys that get a pending override on commit.
    pub fn override_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.overrides.iter().map(|(key, _)| *key)
    }
}

#[derive(Debug)]
pub struct DeviceHub {
    serial: String,
    model: &'static ModelSpec,
    settings: HubSettings,
    state: StateSnapshot,
    pending: PendingOverrideStore,
    last_update: Option<Instant>,
}

impl DeviceHub {
    pub fn new(serial: impl Into<String>, model: &str, settings: HubSettings) -> Result<Self, HubError> {
        let model = ModelSpec::lookup(model).ok_or_else(|| HubError::UnknownModel(model.to_string()))?;
        Ok(Self {
            serial: serial.into(),
            model,
            settings,
            state: StateSnapshot::new(),
            pending: PendingOverrideStore::new(),
            last_update: None,
        })
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn model(&self) -> &'static ModelSpec {
        self.model
    }

    pub fn state(&self) -> &StateSnapshot {
        &self.state
    }

    pub fn pending(&self) -> &PendingOverrideStore {
        &self.pending
    }

    pub fn is_available(&self) -> bool {
        !self.state.is_empty()
    }

    pub fn current_consumption_kw(&self) -> f64 {
        self.model.current_consumption_kw(&self.state)
    }

    /// Feeds one bus payload through decode and reconciliation.
    ///
    /// Returns `None` when the payload is not a valid info telegram; state is
    /// untouched in that case.
    pub fn ingest(&mut self, payload: &str, now: Instant) -> Option<ReconcileReport> {
        let telemetry = decode_telemetry(payload)?;
        let out = reconcile(&self.state, telemetry, &mut self.pending, now);
        self.state = out.state;
        self.last_update = Some(now);
        Some(out.report)
    }

    pub fn poll_command(&self) -> &'static str {
        INFO_COMMAND
    }

    /// Encodes a power step change, resending the other circuit's current step.
    ///
    /// Nothing is recorded until the plan is passed to [`commit`](Self::commit).
    pub fn plan_power_step(&self, circuit: Circuit, value: i64) -> Result<PlannedCommand, HubError> {
        let max_step = self.model.max_step();
        let requested = value.clamp(STEP_MIN, max_step);
        let current = |key: &str| self.state.get_int(key).unwrap_or(STEP_MIN).clamp(STEP_MIN, max_step);

        let (house, tank) = match circuit {
            Circuit::House => (requested, current(TANK_POWER_STEP)),
            Circuit::Tank => (current(HOUSE_POWER_STEP), requested),
        };
        let shown = match circuit {
            Circuit::House => HOUSE_POWER_STEP,
            Circuit::Tank => TANK_POWER_STEP,
        };
        PlannedCommand::encode(
            Command::PowerSteps { house, tank },
            vec![
                (HOUSE_POWER_STEP, FieldValue::Int(house)),
                (TANK_POWER_STEP, FieldValue::Int(tank)),
            ],
            Some((shown, FieldValue::Int(requested))),
        )
    }

    pub fn plan_target_temp(&self, circuit: Circuit, value: f64) -> Result<PlannedCommand, HubError> {
        if !value.is_finite() {
            return Err(HubError::NotFinite(value));
        }
        let temp_c = (value.round() as i64).clamp(TEMP_MIN_C, TEMP_MAX_C);
        let command = match circuit {
            Circuit::House => Command::HouseTarget { temp_c, suffix: self.settings.house_suffix },
            Circuit::Tank => Command::TankTarget { temp_c },
        };
        let key = circuit.target_key();
        PlannedCommand::encode(
            command,
            vec![(key, FieldValue::Int(temp_c))],
            Some((key, FieldValue::Int(temp_c))),
        )
    }

    pub fn plan_switch(&self, kind: SwitchKind, on: bool) -> Result<PlannedCommand, HubError> {
        let key = kind.state_key();
        PlannedCommand::encode(
            Command::Switch { kind, on },
            vec![(key, FieldValue::Bool(on))],
            Some((key, FieldValue::Bool(on))),
        )
    }

    pub fn plan_poll(&self) -> Result<PlannedCommand, HubError> {
        PlannedCommand::encode(Command::Info, Vec::new(), None)
    }

    /// Records a planned command as sent: registers its overrides and shows
    /// the requested value right away. Returns the telegram.
    pub fn commit(&mut self, planned: PlannedCommand, now: Instant) -> String {
        for (key, value) in planned.overrides {
            self.pending.set(key, value, self.settings.pending_ttl, now);
        }
        if let Some((key, value)) = planned.shown {
            self.state.insert(key, value);
            tracing::info!(serial = %self.serial, command = ?planned.command, "command issued");
        }
        planned.telegram
    }

    /// Plans and commits in one step, for callers whose transport cannot fail.
    pub fn set_power_step(&mut self, circuit: Circuit, value: i64, now: Instant) -> Result<String, HubError> {
        let planned = self.plan_power_step(circuit, value)?;
        Ok(self.commit(planned, now))
    }

    pub fn set_target_temp(&mut self, circuit: Circuit, value: f64, now: Instant) -> Result<String, HubError> {
        let planned = self.plan_target_temp(circuit, value)?;
        Ok(self.commit(planned, now))
    }

    pub fn set_switch(&mut self, kind: SwitchKind, on: bool, now: Instant) -> Result<String, HubError> {
        let planned = self.plan_switch(kind, on)?;
        Ok(self.commit(planned, now))
    }

    pub fn status(&self, now: Instant) -> HubStatus {
        let mut pending: Vec<String> = self
            .pending
            .keys()
            .filter(|k| matches!(self.pending.peek(k, now), Some((_, true))))
            .map(str::to_string)
            .collect();
        pending.sort();

        HubStatus {
            serial: self.serial.clone(),
            model: self.model.name,
            available: self.is_available(),
            state: self.state.clone(),
            pending,
            current_consumption_kw: self.current_consumption_kw(),
            max_step: self.model.max_step(),
            seconds_since_update: self
                .last_update
                .map(|t| now.saturating_duration_since(t).as_secs()),
        }
    }
}
