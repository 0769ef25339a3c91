//! Nimbus command implementations

use std::future::Future;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use nimbus_agent::tools::weather_client;
use nimbus_agent::{register_weather_tools, AgentSession, ToolRegistry};
use nimbus_config::{self, CheckpointBackend, Config};
use nimbus_provider::ChatCompletionsProvider;
use nimbus_session::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
use nimbus_trace::{JsonlTraceSink, TraceRecorder};
use nimbus_weather::ResponseAssembler;

use crate::transcript::{is_yes, Transcript, DEFAULT_TRANSCRIPT};

/// Words that end an interactive chat
const EXIT_KEYWORDS: &[&str] = &["exit", "quit", "退出"];

fn is_exit(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    EXIT_KEYWORDS.contains(&input.as_str())
}

/// Read a trimmed line from stdin; `None` at end of input
fn read_line() -> Result<Option<String>> {
    let mut input = String::new();
    let read = std::io::stdin()
        .read_line(&mut input)
        .context("Failed to read from stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Read a secret without echo, falling back to a plain line
fn read_password() -> Result<String> {
    match rpassword::read_password() {
        Ok(secret) => Ok(secret.trim().to_string()),
        Err(_) => Ok(read_line()?.unwrap_or_default()),
    }
}

fn prompt(text: &str) -> Result<()> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(())
}

/// Initialize config and data directory
pub async fn init_command() -> Result<()> {
    println!("Initializing Nimbus...");

    let config = nimbus_config::init()
        .await
        .context("Failed to create config")?;

    println!("Config:  {}", nimbus_config::config_path().display());
    println!("Threads: {}", config.checkpoint_dir().display());
    println!("\nNext steps:");
    println!("  1. Add your keys: nimbus setup");
    println!(
        "     (or set {} and {})",
        nimbus_config::WEATHER_KEY_ENV,
        nimbus_config::ENGINE_KEY_ENV
    );
    println!("  2. Start chatting: nimbus chat");

    Ok(())
}

/// Interactive setup of API keys and model
pub async fn setup_command() -> Result<()> {
    println!("Nimbus setup");
    println!("Press Enter to keep the current value.\n");

    let config_path = nimbus_config::config_path();
    let mut config = Config::load_from(&config_path)
        .await
        .context("Failed to read existing config")?;

    println!("Step 1: QWeather API key (https://dev.qweather.com)");
    prompt(&format!(
        "Weather API key [{}]: ",
        if config.weather.api_key.is_empty() { "not set" } else { "set" }
    ))?;
    let weather_key = read_password()?;
    if !weather_key.is_empty() {
        config.weather.api_key = weather_key;
    }

    println!("\nStep 2: Reasoning engine (OpenAI-compatible)");
    prompt(&format!(
        "Engine API key [{}]: ",
        if config.engine.api_key.is_empty() { "not set" } else { "set" }
    ))?;
    let engine_key = read_password()?;
    if !engine_key.is_empty() {
        config.engine.api_key = engine_key;
    }

    prompt(&format!("Engine API base [{}]: ", config.engine.api_base))?;
    if let Some(base) = read_line()?.filter(|b| !b.is_empty()) {
        config.engine.api_base = base;
    }

    prompt(&format!("Model [{}]: ", config.engine.model))?;
    if let Some(model) = read_line()?.filter(|m| !m.is_empty()) {
        config.engine.model = model;
    }

    config
        .save_to(&config_path)
        .await
        .context("Failed to save config")?;
    println!("\nSaved to {}", config_path.display());
    println!("Start chatting: nimbus chat");

    Ok(())
}

/// Show configuration status
pub async fn status_command() -> Result<()> {
    let config_path = nimbus_config::config_path();

    println!("Nimbus status");
    println!(
        "Config:       {} {}",
        config_path.display(),
        if config_path.exists() { "[OK]" } else { "[Missing]" }
    );

    let config = Config::load_from(&config_path).await?;
    let presence = |set: bool| if set { "[Set]" } else { "[Missing]" };

    println!("Weather key:  {}", presence(config.has_weather_key()));
    println!("Weather host: {}", config.weather.api_host);
    println!("Engine key:   {}", presence(config.has_engine_key()));
    println!("Engine base:  {}", config.engine.api_base);
    println!("Model:        {}", config.model());
    match config.checkpoint.backend {
        CheckpointBackend::Memory => println!("Checkpoints:  memory"),
        CheckpointBackend::File => {
            println!("Checkpoints:  file ({})", config.checkpoint_dir().display())
        }
    }
    match config.trace_path() {
        Some(path) => println!("Trace log:    {}", path.display()),
        None => println!("Trace log:    disabled"),
    }
    println!("Thread:       {}", config.assistant.default_thread);

    Ok(())
}

fn build_store(config: &Config) -> Result<Arc<dyn CheckpointStore>> {
    Ok(match config.checkpoint.backend {
        CheckpointBackend::Memory => Arc::new(MemoryCheckpointStore::new()),
        CheckpointBackend::File => {
            let dir = config.checkpoint_dir();
            let store = FileCheckpointStore::new(&dir, config.session_max_messages())
                .with_context(|| format!("Failed to open thread store at {}", dir.display()))?;
            Arc::new(store)
        }
    })
}

fn build_recorder(config: &Config) -> TraceRecorder {
    let Some(path) = config.trace_path() else {
        return TraceRecorder::disabled();
    };
    match JsonlTraceSink::open(&path) {
        Ok(sink) => {
            info!("Tracing to {}", path.display());
            TraceRecorder::new(sink)
        }
        Err(e) => {
            warn!("Trace log {} unavailable: {}", path.display(), e);
            TraceRecorder::disabled()
        }
    }
}

fn build_session(config: &Config) -> Result<AgentSession<ChatCompletionsProvider>> {
    let weather_key = config.weather_api_key().with_context(|| {
        format!(
            "No weather API key. Run `nimbus setup` or set {}",
            nimbus_config::WEATHER_KEY_ENV
        )
    })?;
    let engine_key = config.engine_api_key().with_context(|| {
        format!(
            "No engine API key. Run `nimbus setup` or set {}",
            nimbus_config::ENGINE_KEY_ENV
        )
    })?;

    let provider = ChatCompletionsProvider::new(
        engine_key,
        Some(config.engine.api_base.clone()),
        Some(config.model()),
    );

    let client = Arc::new(weather_client(&config.weather, weather_key));
    let mut tools = ToolRegistry::new();
    register_weather_tools(&mut tools, Arc::new(ResponseAssembler::from_client(client)));
    info!("Tools: {}", tools.names().join(", "));

    Ok(AgentSession::with_config(
        provider,
        tools,
        build_store(config)?,
        Arc::new(build_recorder(config)),
        config,
    ))
}

/// Chat with the assistant, once or interactively
pub async fn chat_command(
    message: Option<String>,
    thread: Option<String>,
    transcript_path: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load().await.context("Failed to load config")?;
    let thread = thread.unwrap_or_else(|| config.assistant.default_thread.clone());
    let session = build_session(&config)?;
    let mut transcript = Transcript::new();

    if let Some(msg) = message {
        let answer = session.invoke(&thread, &msg).await?;
        println!("{}", answer);
        transcript.push(msg, answer);
        if let Some(path) = transcript_path {
            save_transcript(&transcript, &path).await?;
        }
        return Ok(());
    }

    println!("Ask about the weather. Type 'exit' to quit.");
    println!("----------------------------------------------");

    let mut console = Console::stdin();
    let exit = {
        let session = &session;
        let thread = thread.as_str();
        run_interactive(
            &mut console,
            &mut transcript,
            tokio::signal::ctrl_c,
            |input: String| async move { session.invoke(thread, &input).await },
        )
        .await?
    };
    if exit == LoopExit::Interrupted {
        println!("\n\nConversation interrupted.");
    }

    if transcript.is_empty() {
        return Ok(());
    }

    let path = match transcript_path {
        Some(path) => Some(path),
        None => ask_transcript_path(&mut console).await?,
    };
    if let Some(path) = path {
        save_transcript(&transcript, &path).await?;
    }
    println!("Goodbye!");

    Ok(())
}

/// Why the interactive loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    Keyword,
    EndOfInput,
    Interrupted,
}

/// Terminal lines, fed by a detached reader thread
struct Console {
    lines: mpsc::UnboundedReceiver<String>,
}

impl Console {
    fn stdin() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line.trim().to_string()).is_err() {
                    break;
                }
            }
        });
        Self { lines: rx }
    }

    /// `None` at end of input
    async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }
}

/// Answer lines until the user leaves.
///
/// `interrupt` is polled while waiting for input and while a turn runs; a
/// turn cut short is neither printed nor recorded. An interrupt source that
/// fails is ignored.
async fn run_interactive<T, Fut, I, IFut>(
    console: &mut Console,
    transcript: &mut Transcript,
    interrupt: I,
    mut turn: T,
) -> Result<LoopExit>
where
    T: FnMut(String) -> Fut,
    Fut: Future<Output = nimbus_agent::Result<String>>,
    I: Fn() -> IFut,
    IFut: Future<Output = std::io::Result<()>>,
{
    loop {
        prompt("\nYou: ")?;
        let line = tokio::select! {
            line = console.next_line() => line,
            Ok(()) = interrupt() => return Ok(LoopExit::Interrupted),
        };
        let Some(input) = line else {
            return Ok(LoopExit::EndOfInput);
        };
        if input.is_empty() {
            continue;
        }
        if is_exit(&input) {
            return Ok(LoopExit::Keyword);
        }

        let outcome = tokio::select! {
            outcome = turn(input.clone()) => outcome,
            Ok(()) = interrupt() => return Ok(LoopExit::Interrupted),
        };
        match outcome {
            Ok(answer) => {
                println!("\nAssistant: {}", answer);
                transcript.push(input, answer);
            }
            Err(e) => {
                warn!("Turn failed: {}", e);
                println!("\nError: {}", e);
            }
        }
    }
}

async fn ask_transcript_path(console: &mut Console) -> Result<Option<PathBuf>> {
    prompt("\nSave this conversation? (y/n): ")?;
    let answer = tokio::select! {
        line = console.next_line() => line.unwrap_or_default(),
        Ok(()) = tokio::signal::ctrl_c() => return Ok(None),
    };
    if !is_yes(&answer) {
        return Ok(None);
    }

    prompt(&format!("File name (default '{}'): ", DEFAULT_TRANSCRIPT))?;
    let name = tokio::select! {
        line = console.next_line() => line.filter(|n| !n.is_empty()),
        Ok(()) = tokio::signal::ctrl_c() => return Ok(None),
    };
    Ok(Some(PathBuf::from(
        name.unwrap_or_else(|| DEFAULT_TRANSCRIPT.to_string()),
    )))
}

async fn save_transcript(transcript: &Transcript, path: &std::path::Path) -> Result<()> {
    transcript
        .write_to(path)
        .await
        .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
    println!(
        "Conversation saved to {} ({} exchanges)",
        path.display(),
        transcript.len()
    );
    Ok(())
}
