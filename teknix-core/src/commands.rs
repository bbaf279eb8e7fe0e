//! Outgoing command telegrams.
//!
//! The suffix arithmetic below was reverse-engineered from the controller
//! firmware and has to stay bit-exact. Builders validate their inputs and never
//! clamp.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::frame::{BOILER_POWER_STATE, HOUSE_HEATING_ACTIVE, TANK_HEATING_ACTIVE};

pub const INFO_COMMAND: &str = "INFO";

pub const STEP_MIN: i64 = 1;
pub const STEP_MAX: i64 = 6;
pub const TEMP_MIN_C: i64 = 30;
pub const TEMP_MAX_C: i64 = 80;

/// How the house-temperature suffix is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuffixEncoding {
    #[default]
    Decimal,
    /// Two uppercase hex digits, for older firmware seen in the field.
    LegacyHex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchKind {
    BoilerPower,
    HouseHeating,
    TankHeating,
}

impl SwitchKind {
    pub const ALL: [SwitchKind; 3] = [
        SwitchKind::BoilerPower,
        SwitchKind::HouseHeating,
        SwitchKind::TankHeating,
    ];

    /// State key the device reports this switch under.
    pub fn state_key(self) -> &'static str {
        match self {
            SwitchKind::BoilerPower => BOILER_POWER_STATE,
            SwitchKind::HouseHeating => HOUSE_HEATING_ACTIVE,
            SwitchKind::TankHeating => TANK_HEATING_ACTIVE,
        }
    }

    pub fn telegram(self, on: bool) -> &'static str {
        match (self, on) {
            (SwitchKind::BoilerPower, true) => "T01010002Z",
            (SwitchKind::BoilerPower, false) => "T01000001Z",
            (SwitchKind::HouseHeating, true) => "T120111010007Z",
            (SwitchKind::HouseHeating, false) => "T120011010006Z",
            (SwitchKind::TankHeating, true) => "T13000005Z",
            (SwitchKind::TankHeating, false) => "T13000004Z",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "boiler_power" => Some(SwitchKind::BoilerPower),
            "house_heating" => Some(SwitchKind::HouseHeating),
            "tank_heating" => Some(SwitchKind::TankHeating),
            _ => None,
        }
    }
}

impl fmt::Display for SwitchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SwitchKind::BoilerPower => "boiler_power",
            SwitchKind::HouseHeating => "house_heating",
            SwitchKind::TankHeating => "tank_heating",
        };
        f.write_str(name)
    }
}

/// Every command the controller understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PowerSteps { house: i64, tank: i64 },
    HouseTarget { temp_c: i64, suffix: SuffixEncoding },
    TankTarget { temp_c: i64 },
    Switch { kind: SwitchKind, on: bool },
    Info,
}

impl Command {
    pub fn encode(&self) -> Result<String, ValidationError> {
        match *self {
            Command::PowerSteps { house, tank } => build_power_command(house, tank),
            Command::HouseTarget { temp_c, suffix } => build_house_temp_command(temp_c, suffix),
            Command::TankTarget { temp_c } => build_tank_temp_command(temp_c),
            Command::Switch { kind, on } => Ok(kind.telegram(on).to_string()),
            Command::Info => Ok(INFO_COMMAND.to_string()),
        }
    }
}

fn validate_step(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if (STEP_MIN..=STEP_MAX).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::StepOutOfRange { field, value })
    }
}

fn validate_temp(value: i64) -> Result<(), ValidationError> {
    if (TEMP_MIN_C..=TEMP_MAX_C).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::TemperatureOutOfRange { value })
    }
}

/// `T19{house}20{tank}00{12 + house + tank}Z`
pub fn build_power_command(house_step: i64, tank_step: i64) -> Result<String, ValidationError> {
    validate_step("house_step", house_step)?;
    validate_step("tank_step", tank_step)?;

    let suffix = 12 + house_step + tank_step;
    Ok(format!("T19{house_step:02}20{tank_step:02}00{suffix:02}Z"))
}

pub fn build_house_temp_command(temp_c: i64, encoding: SuffixEncoding) -> Result<String, ValidationError> {
    validate_temp(temp_c)?;

    let (tens, ones) = (temp_c / 10, temp_c % 10);
    let base = 5 + (tens - 3);
    let raw = base + ones;
    let suffix = match encoding {
        SuffixEncoding::Decimal => format!("{raw:02}"),
        SuffixEncoding::LegacyHex => format!("{raw:02X}"),
    };
    Ok(format!("T02{temp_c:02}00{suffix}Z"))
}

pub fn build_tank_temp_command(temp_c: i64) -> Result<String, ValidationError> {
    validate_temp(temp_c)?;

    let (tens, ones) = (temp_c / 10, temp_c % 10);
    let suffix = 9 + tens + ones;
    Ok(format!("T09{temp_c:02}00{suffix:02}Z"))
}
