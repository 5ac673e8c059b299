use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AlertReason {
    InitialMismatch,
    Changed,
    PersistingMismatch,
}

impl AlertReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertReason::InitialMismatch => "initial-mismatch",
            AlertReason::Changed => "changed",
            AlertReason::PersistingMismatch => "persisting-mismatch",
        }
    }

    /// Short human-readable headline for notifications.
    pub fn headline(&self) -> &'static str {
        match self {
            AlertReason::InitialMismatch => "Value differs from expected",
            AlertReason::Changed => "Value changed",
            AlertReason::PersistingMismatch => "Value still differs from expected",
        }
    }
}

impl fmt::Display for AlertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ephemeral alert produced by the value watcher for the notifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertEvent {
    pub reason: AlertReason,
    pub value: String,
    pub previous: Option<String>,
    pub expected: Option<String>,
}

impl AlertEvent {
    pub fn new(reason: AlertReason, value: impl Into<String>) -> Self {
        Self {
            reason,
            value: value.into(),
            previous: None,
            expected: None,
        }
    }

    pub fn with_previous(mut self, previous: impl Into<String>) -> Self {
        self.previous = Some(previous.into());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// One-line body used by desktop and console notifiers.
    pub fn summary(&self) -> String {
        match (&self.reason, &self.previous, &self.expected) {
            (AlertReason::Changed, Some(previous), _) => {
                format!("{}: \"{}\" -> \"{}\"", self.reason.headline(), previous, self.value)
            }
            (_, _, Some(expected)) => format!(
                "{}: \"{}\" (expected \"{}\")",
                self.reason.headline(),
                self.value,
                expected
            ),
            _ => format!("{}: \"{}\"", self.reason.headline(), self.value),
        }
    }
}
