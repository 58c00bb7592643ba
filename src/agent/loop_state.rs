//! Agent loop state management
//!
//! Tracks the phase of the plan/execute cycle, the step history, and the
//! extraction carried into the next planning round.

use std::fmt;

use crate::core::{Extraction, Step, StepHistory};

/// Phase of the agent loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    NotStarted,
    NavigatingStart,
    Planning,
    Executing,
    Done,
    Failed,
}

impl LoopPhase {
    /// Whether the loop may move from `self` to `next`
    pub fn can_transition(self, next: LoopPhase) -> bool {
        use LoopPhase::*;
        matches!(
            (self, next),
            (NotStarted, NavigatingStart)
                | (NavigatingStart, Planning)
                | (Planning, Executing)
                | (Planning, Done)
                | (Executing, Planning)
        ) || (next == Failed && !self.is_terminal())
    }

    /// Whether the loop has stopped
    pub fn is_terminal(self) -> bool {
        matches!(self, LoopPhase::Done | LoopPhase::Failed)
    }
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopPhase::NotStarted => "NOT_STARTED",
            LoopPhase::NavigatingStart => "NAVIGATING_START",
            LoopPhase::Planning => "PLANNING",
            LoopPhase::Executing => "EXECUTING",
            LoopPhase::Done => "DONE",
            LoopPhase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// State of one agent run
#[derive(Debug, Clone)]
pub struct AgentLoopState {
    /// Current phase
    phase: LoopPhase,
    /// Steps taken so far, including the starting GOTO
    pub history: StepHistory,
    /// Result of the last EXTRACT/OBSERVE, consumed by the next planning round
    pub last_extraction: Option<Extraction>,
    /// Number of planning rounds completed
    pub planned: usize,
    /// Maximum planning rounds, `None` for unbounded
    pub max_steps: Option<usize>,
}

impl AgentLoopState {
    /// Create a new loop state with the given step limit
    pub fn new(max_steps: Option<usize>) -> Self {
        Self {
            phase: LoopPhase::NotStarted,
            history: StepHistory::new(),
            last_extraction: None,
            planned: 0,
            max_steps,
        }
    }

    /// Current phase
    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Move to the next phase
    pub fn advance(&mut self, next: LoopPhase) {
        debug_assert!(
            self.phase.can_transition(next),
            "illegal loop transition {} -> {}",
            self.phase,
            next
        );
        tracing::trace!(from = %self.phase, to = %next, "Loop transition");
        self.phase = next;
    }

    /// Check if another planning round is allowed
    pub fn limit_reached(&self) -> bool {
        self.max_steps.is_some_and(|max| self.planned >= max)
    }

    /// Record the starting navigation
    pub fn record_start(&mut self, step: Step) {
        self.history.push(step);
    }

    /// Record a planned step and count the round
    pub fn record_planned(&mut self, step: Step) {
        self.planned += 1;
        self.history.push(step);
    }

    /// Replace the carried extraction with the latest tool output
    pub fn set_extraction(&mut self, extraction: Option<Extraction>) {
        self.last_extraction = extraction;
    }
}
