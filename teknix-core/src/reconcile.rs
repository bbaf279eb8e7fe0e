//! Merging telemetry into state while local commands are in flight.
//!
//! The device echoes commands back with a short, variable lag. Until it does,
//! a pending override hides telemetry that still shows the old value. Each key
//! is decided on its own:
//!
//! - no live override: take the telemetry value
//! - live override, different value: keep the prior value, override stays
//! - live override, same value: take it and drop the override
//!
//! An override that outlives its TTL is swept and the next frame wins, even if
//! the device never applied the command.

use serde::Serialize;
use std::time::Instant;

use crate::pending::PendingOverrideStore;
use crate::telemetry::StateSnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub accepted: Vec<String>,
    pub ignored: Vec<String>,
    /// Accepted keys whose override the device just confirmed.
    pub confirmed: Vec<String>,
    pub swept: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub state: StateSnapshot,
    pub report: ReconcileReport,
}

pub fn reconcile(
    prior: &StateSnapshot,
    telemetry: StateSnapshot,
    pending: &mut PendingOverrideStore,
    now: Instant,
) -> Reconciled {
    let mut report = ReconcileReport {
        swept: pending.sweep(now),
        ..Default::default()
    };
    let mut state = prior.clone();

    for (key, incoming) in telemetry {
        let verdict = pending
            .peek(&key, now)
            .filter(|(_, active)| *active)
            .map(|(wanted, _)| *wanted == incoming);

        match verdict {
            None => {
                state.insert(key.clone(), incoming);
                report.accepted.push(key);
            }
            Some(false) => {
                tracing::debug!(key = %key, "telemetry contradicts pending override, ignored");
                report.ignored.push(key);
            }
            Some(true) => {
                pending.clear(&key);
                state.insert(key.clone(), incoming);
                report.confirmed.push(key.clone());
                report.accepted.push(key);
            }
        }
    }

    Reconciled { state, report }
}
