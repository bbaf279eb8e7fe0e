//! Teknix boiler telegram codec and telemetry reconciliation.
//!
//! - [`frame`]: pull `I...Z` telegrams out of bus payloads and split them
//! - [`telemetry`]: map token vectors onto named, typed state
//! - [`commands`]: encode outgoing command telegrams
//! - [`pending`] and [`reconcile`]: keep fresh local commands from being
//!   overwritten by stale telemetry echoes
//! - [`hub`]: one device's state and overrides behind a single owner

pub mod commands;
pub mod error;
pub mod frame;
pub mod hub;
pub mod models;
pub mod pending;
pub mod reconcile;
pub mod telemetry;

pub use commands::{Command, SuffixEncoding, SwitchKind, INFO_COMMAND};
pub use error::{HubError, ParseError, ValidationError};
pub use hub::{Circuit, DeviceHub, HubSettings, HubStatus, PlannedCommand};
pub use models::ModelSpec;
pub use pending::{PendingOverrideStore, DEFAULT_PENDING_TTL};
pub use reconcile::{reconcile, ReconcileReport, Reconciled};
pub use telemetry::{decode_telemetry, FieldValue, StateSnapshot};
