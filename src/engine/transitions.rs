use crate::model::{RecordStatus, TaskStatus};

use super::EngineError;

// ── Transition tables ────────────────────────────────────────────
//
// `Available` on the record side stands for "no record": entering it
// removes the record, leaving it creates one.

impl RecordStatus {
    pub fn can_transition_to(self, next: RecordStatus) -> bool {
        use RecordStatus::*;
        matches!(
            (self, next),
            (Available, Booked)
                | (Available, Maintenance)
                | (Booked, CheckIn)
                | (Booked, Available)
                | (CheckIn, CheckOut)
                | (CheckOut, Pending)
                | (CheckOut, Available)
                | (Pending, Available)
                | (Maintenance, Available)
        )
    }
}

impl TaskStatus {
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress) | (Pending, Completed) | (InProgress, Completed) | (Maintenance, Completed)
        )
    }
}

pub fn check_record_transition(from: RecordStatus, to: RecordStatus) -> Result<(), EngineError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(EngineError::IllegalTransition {
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

pub fn check_task_transition(from: TaskStatus, to: TaskStatus) -> Result<(), EngineError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(EngineError::IllegalTransition {
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}
