// Agent module - orchestration of model turns and tool calls

pub mod config;
pub mod error;
pub mod loop_;
pub mod messages;
pub mod types;

pub use error::AgentError;
pub use loop_::{AgentLoop, BrainRef};
pub use types::{AgentConfig, LoopState, RunOutcome, Session, Termination};
