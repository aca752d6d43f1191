use std::fmt;

use gridproof_common::{GridproofError, Result};
use serde::Serialize;

use crate::step::Milestone;

/// Progress of a single flow run.
///
/// States only move forward one step at a time; `Failed` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlowState {
    Pending,
    Reached { index: usize, milestone: Milestone },
    /// `step` is the index of the step that failed; `last` the milestone
    /// reached before it, if any.
    Failed { step: usize, last: Option<Milestone> },
}

impl FlowState {
    /// Index the next step must have.
    fn next_index(&self) -> Option<usize> {
        match self {
            FlowState::Pending => Some(0),
            FlowState::Reached { index, .. } => Some(index + 1),
            FlowState::Failed { .. } => None,
        }
    }

    /// Record completion of step `index`.
    pub fn advance(&self, index: usize, milestone: Milestone) -> Result<FlowState> {
        if self.next_index() != Some(index) {
            return Err(GridproofError::InvalidTransition {
                from: self.to_string(),
                to: format!("{milestone} (step {index})"),
            });
        }
        Ok(FlowState::Reached { index, milestone })
    }

    /// Record failure of step `index`, keeping the last milestone reached.
    pub fn fail(&self, index: usize) -> FlowState {
        FlowState::Failed {
            step: index,
            last: self.milestone().cloned(),
        }
    }

    pub fn milestone(&self) -> Option<&Milestone> {
        match self {
            FlowState::Reached { milestone, .. } => Some(milestone),
            FlowState::Failed { last, .. } => last.as_ref(),
            FlowState::Pending => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FlowState::Failed { .. })
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Pending => f.write_str("Pending"),
            FlowState::Reached { milestone, .. } => write!(f, "{milestone}"),
            FlowState::Failed { step, .. } => write!(f, "Failed(step {step})"),
        }
    }
}
