//! Run lifecycle as a pure transition function.
//!
//! ```text
//! AwaitingInit -> Sampling <-> AwaitingEvaluations -> Updating
//!                    ^                                  |
//!                    +-------- Continue ----------------+
//!                                                       |
//!                              Converged / Failed <-----+
//!                                       |
//!                   Stop ---------> Draining -> Closed
//! ```

use crate::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingInit,
    /// Ready to hand out a fresh batch.
    Sampling,
    AwaitingEvaluations,
    Updating,
    Converged,
    Failed,
    /// Absorbing late answers before close.
    Draining,
    Closed,
}

impl Phase {
    /// The run will produce no further generations.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            Phase::Converged | Phase::Failed | Phase::Draining | Phase::Closed
        )
    }
}

/// Result of an update step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Continue,
    Converged,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Initialized,
    BatchDispatched,
    /// Counters are taken after the answer was recorded.
    ResultReceived { sent: usize, received: usize },
    Updated(UpdateOutcome),
    DoneEmitted,
    StopRequested,
    CloseRequested,
}

/// What the caller of [`transition`] should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    DispatchNext,
    Wait,
    RunUpdate,
    EmitNotice,
    EmitDone,
    Fold,
    Close,
}

pub fn transition(phase: Phase, event: Event, population: usize) -> Result<(Phase, Action), ProtocolError> {
    use Phase::*;
    let next = match (phase, event) {
        (AwaitingInit, Event::Initialized) | (Closed, Event::Initialized) => (Sampling, Action::None),
        (Sampling, Event::BatchDispatched) => (AwaitingEvaluations, Action::None),
        (AwaitingEvaluations, Event::ResultReceived { sent, received }) => {
            if sent < population {
                (AwaitingEvaluations, Action::DispatchNext)
            } else if received < population {
                (AwaitingEvaluations, Action::Wait)
            } else {
                (Updating, Action::RunUpdate)
            }
        }
        (Updating, Event::Updated(UpdateOutcome::Continue)) => (Sampling, Action::EmitNotice),
        (Updating, Event::Updated(UpdateOutcome::Converged)) => (Converged, Action::EmitDone),
        (Updating, Event::Updated(UpdateOutcome::Failed)) => (Failed, Action::EmitDone),
        (Converged, Event::DoneEmitted) | (Failed, Event::DoneEmitted) => (Draining, Action::None),
        (Sampling, Event::StopRequested)
        | (AwaitingEvaluations, Event::StopRequested)
        | (Draining, Event::StopRequested) => (Draining, Action::None),
        (Draining, Event::ResultReceived { .. }) => (Draining, Action::Fold),
        (Draining, Event::CloseRequested) => (Closed, Action::Close),
        (phase, event) => return Err(ProtocolError::InvalidTransition { phase, event }),
    };
    Ok(next)
}
