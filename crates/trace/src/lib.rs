//! Operator trace of queries, engine rounds and tool calls
//!
//! A [`TraceRecorder`] turns lifecycle callbacks into [`TraceEvent`]s and
//! hands them to a [`TraceSink`]. The recorder's only mutable state is the
//! last user input it saw, used to emit `query-start` once per new query, so
//! one instance must be shared by everything that reports events.

use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

pub mod sink;

pub use sink::{JsonlTraceSink, MemoryTraceSink, NullTraceSink, TraceSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceKind {
    QueryStart,
    EngineStart,
    EngineEnd,
    ToolStart,
    ToolEnd,
}

/// One line of the trace log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub timestamp: DateTime<Local>,
    pub kind: TraceKind,
    pub payload: Value,
}

impl TraceEvent {
    pub fn new(kind: TraceKind, payload: Value) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            payload,
        }
    }
}

pub struct TraceRecorder {
    sink: Box<dyn TraceSink>,
    last_user_input: Mutex<Option<String>>,
}

impl TraceRecorder {
    pub fn new(sink: impl TraceSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            last_user_input: Mutex::new(None),
        }
    }

    /// Recorder that drops every event
    pub fn disabled() -> Self {
        Self::new(NullTraceSink)
    }

    fn emit(&self, kind: TraceKind, payload: Value) {
        debug!(target: "nimbus::trace", ?kind, "{}", payload);
        self.sink.append(&TraceEvent::new(kind, payload));
    }

    /// Emit `query-start` unless `user_input` repeats the previous input seen
    /// by this recorder. Returns whether the marker was emitted.
    pub fn on_query_start(&self, thread_id: &str, user_input: &str) -> bool {
        {
            let mut last = match self.last_user_input.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if last.as_deref() == Some(user_input) {
                return false;
            }
            *last = Some(user_input.to_string());
        }

        self.emit(
            TraceKind::QueryStart,
            json!({ "thread_id": thread_id, "user_input": user_input }),
        );
        true
    }

    pub fn on_engine_start<P: Serialize + ?Sized>(&self, thread_id: &str, prompt: &P) {
        self.emit(
            TraceKind::EngineStart,
            json!({ "thread_id": thread_id, "prompt": prompt }),
        );
    }

    pub fn on_engine_end<O: Serialize + ?Sized>(&self, thread_id: &str, output: &O) {
        self.emit(
            TraceKind::EngineEnd,
            json!({ "thread_id": thread_id, "output": output }),
        );
    }

    pub fn on_tool_start(&self, thread_id: &str, tool: &str, arguments: &Value) {
        self.emit(
            TraceKind::ToolStart,
            json!({ "thread_id": thread_id, "tool": tool, "arguments": arguments }),
        );
    }

    pub fn on_tool_end(&self, thread_id: &str, tool: &str, result: &str) {
        self.emit(
            TraceKind::ToolEnd,
            json!({ "thread_id": thread_id, "tool": tool, "result": result }),
        );
    }
}
