// Agent types

use crate::agent::error::AgentError;
use crate::brain::ContentBlock;
use crate::transcript::Transcript;
use std::collections::VecDeque;
use uuid::Uuid;

/// Agent loop configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum model calls per run
    pub max_iterations: u32,
    /// Pause after a tool reports a downstream timeout
    pub timeout_pause_secs: u64,
    /// System prompt sent with every model call
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            timeout_pause_secs: 10,
            system_prompt: None,
        }
    }
}

/// One conversation: the transcript and an id for log correlation
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub transcript: Transcript,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            transcript: Transcript::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// States of a single run
#[derive(Debug)]
pub enum LoopState {
    /// Next step is a model call
    AwaitingModel,
    /// Working through the blocks of the last response, in emitted order
    ExecutingTools {
        pending: VecDeque<ContentBlock>,
        tool_called: bool,
    },
    Done(Termination),
    Aborted(AgentError),
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The model answered without requesting a tool
    Completed,
    /// The iteration cap was hit while the model still requested tools
    IterationCap,
}

/// Outcome of a run that did not abort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub termination: Termination,
    /// Model calls made during the run
    pub iterations: u32,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.termination == Termination::Completed
    }
}
