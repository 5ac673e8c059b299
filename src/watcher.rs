use crate::models::{AlertEvent, AlertReason, CheckResult, ObservationState};

/// Compares each cycle's result against the previous observation and the
/// optional baseline, deciding whether the operator must be alerted.
///
/// Transition table for a `Success { value }`:
///
/// | last value | value vs last | value vs expected | alert               |
/// |------------|---------------|-------------------|---------------------|
/// | unset      | -             | differs           | initial-mismatch    |
/// | unset      | -             | equal / none      | none                |
/// | set        | differs       | -                 | changed             |
/// | set        | equal         | differs           | persisting-mismatch |
/// | set        | equal         | equal / none      | none                |
///
/// A `Failure` leaves the state untouched and never alerts. The
/// persisting-mismatch row fires on every cycle while the mismatch lasts.
pub struct ValueWatcher;

impl ValueWatcher {
    pub fn observe(
        result: &CheckResult,
        state: ObservationState,
    ) -> (ObservationState, Option<AlertEvent>) {
        let value = match result {
            CheckResult::Success { value } => value,
            CheckResult::Failure { .. } => return (state, None),
        };

        let mismatch = state.mismatches(value);
        let alert = match state.last_value.as_deref() {
            None => mismatch.then(|| Self::event(AlertReason::InitialMismatch, value, &state)),
            Some(last) if last != value.as_str() => {
                Some(Self::event(AlertReason::Changed, value, &state).with_previous(last))
            }
            Some(_) => mismatch.then(|| Self::event(AlertReason::PersistingMismatch, value, &state)),
        };

        let next = ObservationState {
            last_value: Some(value.clone()),
            expected_value: state.expected_value,
        };
        (next, alert)
    }

    fn event(reason: AlertReason, value: &str, state: &ObservationState) -> AlertEvent {
        let event = AlertEvent::new(reason, value);
        match &state.expected_value {
            Some(expected) => event.with_expected(expected.clone()),
            None => event,
        }
    }
}
