//! Weather assistant core
//!
//! The tool registry exposed to the reasoning engine and the per-thread
//! session loop that drives it.

use thiserror::Error;

pub mod context;
pub mod session;
pub mod tools;

pub use context::ContextBuilder;
pub use session::{AgentSession, TurnPhase};
pub use tools::{register_weather_tools, ToolRegistry, ToolTrait};

/// Failures that end a turn
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("checkpoint store failed: {0}")]
    Session(#[from] nimbus_session::SessionError),

    #[error("invalid thread id '{0}'")]
    InvalidThreadId(String),

    #[error("engine error: {0}")]
    Provider(String),

    #[error("no final answer after {0} engine rounds")]
    MaxIterations(u32),

    #[error("tool '{0}' not found")]
    ToolNotFound(String),

    #[error("tool failed: {0}")]
    ToolExecution(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
