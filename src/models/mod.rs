use serde::{Deserialize, Serialize};
use std::fmt;

pub mod alert;
pub mod check;
pub mod observation;

// Re-exports for convenience
pub use alert::*;
pub use check::*;
pub use observation::*;

/// Navigation steps of a cycle, used to attribute failures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Navigate,
    SetDeparture,
    SetArrival,
    OpenCalendar,
    PickDate,
    SubmitSearch,
    ExtractResult,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Navigate => "NAVIGATE",
            Stage::SetDeparture => "SET_DEPARTURE",
            Stage::SetArrival => "SET_ARRIVAL",
            Stage::OpenCalendar => "OPEN_CALENDAR",
            Stage::PickDate => "PICK_DATE",
            Stage::SubmitSearch => "SUBMIT_SEARCH",
            Stage::ExtractResult => "EXTRACT_RESULT",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
