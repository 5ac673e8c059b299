use serde::{Deserialize, Serialize};

/// Last successfully observed value plus the operator's optional baseline.
///
/// Owned by the scheduler loop and handed to the value watcher each cycle.
/// `last_value` is only ever replaced by a freshly extracted value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObservationState {
    pub last_value: Option<String>,
    pub expected_value: Option<String>,
}

impl ObservationState {
    pub fn new(expected_value: Option<String>) -> Self {
        Self {
            last_value: None,
            expected_value,
        }
    }

    /// True when a baseline is configured and `value` differs from it.
    pub fn mismatches(&self, value: &str) -> bool {
        self.expected_value
            .as_deref()
            .is_some_and(|expected| expected != value)
    }
}
