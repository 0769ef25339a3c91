//! Per-thread conversation loop

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use nimbus_config::Config;
use nimbus_provider::{ChatParams, ChatResponse, Message, Provider, ToolCall, ToolCallDef};
use nimbus_session::{CheckpointStore, SessionState, DEFAULT_MAX_MESSAGES};
use nimbus_trace::TraceRecorder;

use crate::context::ContextBuilder;
use crate::tools::ToolRegistry;
use crate::{AgentError, Result};

/// Where a turn currently is
#[derive(Debug)]
pub enum TurnPhase {
    /// Waiting for the engine to answer or request tools
    AwaitingModelDecision,
    /// The engine asked for these tools
    ToolCallRequested(ChatResponse),
    /// Running requested tools one at a time
    ToolExecuting(VecDeque<ToolCall>),
    FinalAnswerReady(String),
}

type TurnLock = Arc<tokio::sync::Mutex<()>>;
type ThreadLocks = Mutex<HashMap<String, TurnLock>>;

fn lock_map(locks: &ThreadLocks) -> MutexGuard<'_, HashMap<String, TurnLock>> {
    match locks.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A thread's turn lock, dropped from the map when its last holder leaves
struct ThreadLease<'a> {
    locks: &'a ThreadLocks,
    thread_id: String,
    lock: TurnLock,
}

impl Drop for ThreadLease<'_> {
    fn drop(&mut self) {
        let mut locks = lock_map(self.locks);
        // held only by the map and this lease
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.thread_id);
        }
    }
}

/// Binds the engine to the tool registry for any number of threads.
///
/// Turns on the same thread id run one at a time; distinct threads are
/// independent and may be driven concurrently.
pub struct AgentSession<P: Provider> {
    provider: Arc<P>,
    tools: ToolRegistry,
    context: ContextBuilder,
    store: Arc<dyn CheckpointStore>,
    recorder: Arc<TraceRecorder>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    max_iterations: u32,
    history_messages: usize,
    max_messages: usize,
    thread_locks: ThreadLocks,
}

impl<P: Provider> AgentSession<P> {
    pub fn new(
        provider: P,
        tools: ToolRegistry,
        store: Arc<dyn CheckpointStore>,
        recorder: Arc<TraceRecorder>,
    ) -> Self {
        let model = provider.default_model();
        let defaults = ChatParams::default();
        Self {
            provider: Arc::new(provider),
            tools,
            context: ContextBuilder::new(),
            store,
            recorder,
            model,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            max_iterations: 10,
            history_messages: 20,
            max_messages: DEFAULT_MAX_MESSAGES,
            thread_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Engine parameters and limits taken from `config`
    pub fn with_config(
        provider: P,
        tools: ToolRegistry,
        store: Arc<dyn CheckpointStore>,
        recorder: Arc<TraceRecorder>,
        config: &Config,
    ) -> Self {
        let mut session = Self::new(provider, tools, store, recorder);
        session.model = config.model();
        session.max_tokens = config.engine.max_tokens;
        session.temperature = config.engine.temperature;
        session.max_iterations = config.assistant.max_tool_iterations;
        session.history_messages = config.assistant.history_messages;
        session.max_messages = config.session_max_messages();
        session.context =
            ContextBuilder::new().with_system_prompt(config.assistant.system_prompt.clone());
        session
    }

    /// Bound on engine rounds per turn
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Stored messages replayed to the engine each turn
    pub fn with_history_messages(mut self, history_messages: usize) -> Self {
        self.history_messages = history_messages;
        self
    }

    fn lease(&self, thread_id: &str) -> ThreadLease<'_> {
        let lock = lock_map(&self.thread_locks)
            .entry(thread_id.to_string())
            .or_default()
            .clone();
        ThreadLease {
            locks: &self.thread_locks,
            thread_id: thread_id.to_string(),
            lock,
        }
    }

    /// Run one turn on `thread_id` and return the assistant's answer.
    ///
    /// The turn is persisted only when it completes; engine and store
    /// failures end the turn with an error.
    pub async fn invoke(&self, thread_id: &str, user_message: &str) -> Result<String> {
        let raw_id = thread_id;
        let thread_id = raw_id.trim();
        if thread_id.is_empty() {
            return Err(AgentError::InvalidThreadId(raw_id.to_string()));
        }

        let lease = self.lease(thread_id);
        let _turn = lease.lock.lock().await;

        info!("Turn on thread {}", thread_id);
        self.recorder.on_query_start(thread_id, user_message);

        let mut state = self
            .store
            .load(thread_id)
            .await?
            .unwrap_or_else(|| SessionState::with_max_messages(thread_id, self.max_messages));

        let messages = self
            .context
            .build_messages(state.history(self.history_messages), user_message);

        let answer = self.run_turn(thread_id, messages).await?;

        state.record_turn(user_message, answer.as_str());
        self.store.save(&state).await?;

        Ok(answer)
    }

    async fn run_turn(&self, thread_id: &str, mut messages: Vec<Message>) -> Result<String> {
        let mut rounds = 0;
        let mut phase = TurnPhase::AwaitingModelDecision;

        loop {
            phase = match phase {
                TurnPhase::AwaitingModelDecision => {
                    rounds += 1;
                    if rounds > self.max_iterations {
                        warn!("Thread {} hit {} engine rounds", thread_id, self.max_iterations);
                        return Err(AgentError::MaxIterations(self.max_iterations));
                    }
                    debug!("Engine round {} on thread {}", rounds, thread_id);

                    let response = self.decide(thread_id, &messages).await?;
                    if response.has_tool_calls() {
                        TurnPhase::ToolCallRequested(response)
                    } else {
                        TurnPhase::FinalAnswerReady(response.content.unwrap_or_default())
                    }
                }
                TurnPhase::ToolCallRequested(response) => {
                    let defs: Vec<ToolCallDef> =
                        response.tool_calls.iter().map(ToolCallDef::from).collect();
                    ContextBuilder::add_assistant_message(
                        &mut messages,
                        response.content.as_deref(),
                        defs,
                    );
                    TurnPhase::ToolExecuting(response.tool_calls.into())
                }
                TurnPhase::ToolExecuting(mut pending) => match pending.pop_front() {
                    Some(call) => {
                        let result = self.dispatch(thread_id, &call).await;
                        ContextBuilder::add_tool_result(&mut messages, &call.id, &call.name, &result);
                        TurnPhase::ToolExecuting(pending)
                    }
                    None => TurnPhase::AwaitingModelDecision,
                },
                TurnPhase::FinalAnswerReady(answer) => return Ok(answer),
            };
        }
    }

    async fn decide(&self, thread_id: &str, messages: &[Message]) -> Result<ChatResponse> {
        self.recorder.on_engine_start(thread_id, messages);

        let params = ChatParams {
            model: self.model.clone(),
            messages: messages.to_vec(),
            tools: self.tools.definitions(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let response = self
            .provider
            .chat(params)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        self.recorder.on_engine_end(thread_id, &response);
        Ok(response)
    }

    /// Execute one tool call; every failure comes back as text for the engine
    async fn dispatch(&self, thread_id: &str, call: &ToolCall) -> String {
        debug!("Executing tool {} on thread {}", call.name, thread_id);
        self.recorder
            .on_tool_start(thread_id, &call.name, &call.arguments);

        let result = self
            .tools
            .execute(&call.name, call.arguments.clone())
            .await
            .unwrap_or_else(|e| format!("Error: {}", e));

        self.recorder.on_tool_end(thread_id, &call.name, &result);
        result
    }
}
