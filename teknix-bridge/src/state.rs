use parking_lot::Mutex;
use std::sync::Arc;
use teknix_core::DeviceHub;

pub type Shared<T> = Arc<Mutex<T>>;

/// The hub lock covers exactly one reconciliation pass or one command issue.
pub type SharedHub = Shared<DeviceHub>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}
