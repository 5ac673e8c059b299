use serde::{Deserialize, Serialize};

use super::Stage;
use crate::utils::error::AppError;

/// A failed cycle, attributed to the stage that was running.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckFailure {
    pub stage: Stage,
    pub message: String,
}

impl CheckFailure {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    pub fn from_error(stage: Stage, err: &AppError) -> Self {
        Self::new(stage, err.to_string())
    }
}

/// Outcome of one navigation cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum CheckResult {
    Success { value: String },
    Failure { stage: Stage, message: String },
}

impl CheckResult {
    pub fn success(value: impl Into<String>) -> Self {
        CheckResult::Success {
            value: value.into(),
        }
    }

    pub fn failure(stage: Stage, message: impl Into<String>) -> Self {
        CheckResult::Failure {
            stage,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CheckResult::Success { .. })
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            CheckResult::Success { value } => Some(value),
            CheckResult::Failure { .. } => None,
        }
    }
}

impl From<CheckFailure> for CheckResult {
    fn from(failure: CheckFailure) -> Self {
        CheckResult::Failure {
            stage: failure.stage,
            message: failure.message,
        }
    }
}
