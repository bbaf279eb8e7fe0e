use serde::Serialize;

use crate::commands::STEP_MAX;
use crate::frame::{HOUSE_HEATING_ACTIVE, HOUSE_POWER_STEP, TANK_HEATING_ACTIVE, TANK_POWER_STEP};
use crate::telemetry::StateSnapshot;

/// Heater model: how many elements it switches and what each one draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelSpec {
    pub name: &'static str,
    pub elements_count: u32,
    pub element_kw: f64,
}

pub const MODELS: &[ModelSpec] = &[
    ModelSpec { name: "ESPRO 4.5", elements_count: 3, element_kw: 1.50 },
    ModelSpec { name: "ESPRO 6", elements_count: 6, element_kw: 1.00 },
    ModelSpec { name: "ESPRO 7.5", elements_count: 6, element_kw: 1.25 },
    ModelSpec { name: "ESPRO 9", elements_count: 6, element_kw: 1.50 },
    ModelSpec { name: "ESPRO 12", elements_count: 6, element_kw: 2.00 },
    ModelSpec { name: "ESPRO 15", elements_count: 6, element_kw: 2.50 },
    ModelSpec { name: "ESPRO 18", elements_count: 6, element_kw: 3.00 },
    ModelSpec { name: "ESPRO 21", elements_count: 9, element_kw: 2.33 },
    ModelSpec { name: "ESPRO 24", elements_count: 9, element_kw: 2.66 },
];

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl ModelSpec {
    pub fn lookup(name: &str) -> Option<&'static ModelSpec> {
        MODELS.iter().find(|m| m.name == name)
    }

    pub fn total_kw(&self) -> f64 {
        round2(f64::from(self.elements_count) * self.element_kw)
    }

    /// Highest power step the controller accepts for this model.
    pub fn max_step(&self) -> i64 {
        STEP_MAX.min(i64::from(self.elements_count))
    }

    /// Instantaneous draw in kW derived from the heating flags and steps.
    pub fn current_consumption_kw(&self, state: &StateSnapshot) -> f64 {
        if self.element_kw <= 0.0 {
            return 0.0;
        }

        let max_step = self.max_step();
        let house_active = state.get_bool(HOUSE_HEATING_ACTIVE).unwrap_or(false);
        let tank_active = state.get_bool(TANK_HEATING_ACTIVE).unwrap_or(false);
        let house_step = state.get_int(HOUSE_POWER_STEP).unwrap_or(0).clamp(0, max_step);
        let tank_step = state.get_int(TANK_POWER_STEP).unwrap_or(0).clamp(0, max_step);

        let step = match (house_active, tank_active) {
            (true, false) => house_step,
            (false, true) => tank_step,
            (true, true) => house_step.max(tank_step),
            (false, false) => 0,
        };
        round2(step as f64 * self.element_kw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_ratings() {
        let m = ModelSpec::lookup("ESPRO 21").unwrap();
        assert_eq!(m.total_kw(), 20.97);
        assert_eq!(m.max_step(), 6);
        assert_eq!(ModelSpec::lookup("ESPRO 4.5").unwrap().max_step(), 3);
        assert_eq!(ModelSpec::lookup("ESPRO 24").unwrap().total_kw(), 23.94);
        assert!(ModelSpec::lookup("espro 9").is_none());
    }

    #[test]
    fn test_consumption_by_active_circuit() {
        let m = ModelSpec::lookup("ESPRO 9").unwrap();
        let mut state = StateSnapshot::new();
        state.insert(HOUSE_POWER_STEP, 2i64);
        state.insert(TANK_POWER_STEP, 5i64);

        state.insert(HOUSE_HEATING_ACTIVE, false);
        state.insert(TANK_HEATING_ACTIVE, false);
        assert_eq!(m.current_consumption_kw(&state), 0.0);

        state.insert(HOUSE_HEATING_ACTIVE, true);
        assert_eq!(m.current_consumption_kw(&state), 3.0);

        state.insert(TANK_HEATING_ACTIVE, true);
        assert_eq!(m.current_consumption_kw(&state), 7.5);

        state.insert(HOUSE_HEATING_ACTIVE, false);
        assert_eq!(m.current_consumption_kw(&state), 7.5);
    }

    #[test]
    fn test_consumption_clamps_steps_to_model() {
        let m = ModelSpec::lookup("ESPRO 4.5").unwrap();
        let mut state = StateSnapshot::new();
        state.insert(TANK_HEATING_ACTIVE, true);
        state.insert(TANK_POWER_STEP, 6i64);
        assert_eq!(m.current_consumption_kw(&state), 4.5);

        assert_eq!(m.current_consumption_kw(&StateSnapshot::new()), 0.0);
    }
}
