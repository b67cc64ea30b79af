mod agent;
mod artifacts;
mod brain;
mod mcp;
mod transcript;

use agent::{AgentConfig, AgentLoop, Session, Termination};
use artifacts::{ArtifactConfig, ArtifactStore};
use brain::{Brain, BrainConfig};
use clap::Parser;
use mcp::{McpClient, ServerConfig};
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use std::path::PathBuf;
use tracing::{Level, error, info, warn};
use tracing_subscriber::fmt;
use transcript::Entry;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "pilot")]
#[command(about = "Drive an MCP tool server with an LLM", version)]
struct Args {
    /// Server script to launch (.py runs with python, .js with node)
    #[arg(required_unless_present = "config")]
    server_script: Option<String>,

    /// Extra arguments passed to the server script
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    server_args: Vec<String>,

    /// TOML file describing the server command instead of a script
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File with one instruction per line, run before the prompt
    #[arg(short, long)]
    instructions: Option<PathBuf>,

    /// File whose contents are sent as the system prompt
    #[arg(long)]
    system_prompt: Option<PathBuf>,

    /// Maximum model calls per input
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Directory for saved images
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,

    /// Exit after the instruction file instead of prompting
    #[arg(long)]
    no_interactive: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

type Pilot = AgentLoop<Brain, McpClient>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(true)
        .with_file(args.verbose)
        .with_line_number(args.verbose)
        .init();

    info!("Starting pilot...");

    let server_config = match (&args.config, &args.server_script) {
        (Some(path), _) => ServerConfig::load(path)?,
        (None, Some(script)) => ServerConfig::from_script(script, &args.server_args)?,
        (None, None) => return Err("either a server script or --config is required".into()),
    };

    let brain_config = BrainConfig::from_env()?;
    let mut agent_config = AgentConfig::from_env();
    if let Some(max) = args.max_iterations {
        agent_config.max_iterations = max;
    }
    if let Some(path) = &args.system_prompt {
        agent_config.system_prompt = Some(std::fs::read_to_string(path)?);
    }
    let mut artifact_config = ArtifactConfig::from_env();
    if let Some(dir) = &args.artifacts_dir {
        artifact_config.dir = dir.clone();
    }

    info!(
        model = %brain_config.model,
        max_iterations = agent_config.max_iterations,
        artifacts = %artifact_config.dir.display(),
        "Configuration loaded"
    );

    let brain = Brain::new(brain_config)?;
    let transport = McpClient::spawn(&server_config).await?;
    info!(command = %server_config.command, "Tool server connected");

    let agent = AgentLoop::new(
        brain,
        transport,
        ArtifactStore::new(artifact_config),
        agent_config,
    );
    let mut session = Session::new();

    if let Some(path) = &args.instructions {
        let script = std::fs::read_to_string(path)?;
        for instruction in script.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if instruction.eq_ignore_ascii_case("quit") {
                break;
            }
            handle_input(&agent, &mut session, instruction).await;
        }
    }

    if !args.no_interactive {
        repl(&agent, &mut session).await?;
    }

    info!("Shutting down...");
    agent.into_transport().shutdown().await;
    info!("Goodbye!");
    Ok(())
}

/// Interactive prompt until `quit` or Ctrl+D
async fn repl(agent: &Pilot, session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let history_file = dirs::home_dir()
        .map(|p| p.join(".pilot_history"))
        .unwrap_or_else(|| PathBuf::from(".pilot_history"));

    let mut rl: Editor<(), FileHistory> = Editor::new()?;
    if history_file.exists()
        && let Err(e) = rl.load_history(&history_file)
    {
        warn!(error = %e, "Failed to load history");
    }

    println!("pilot v{}", env!("CARGO_PKG_VERSION"));
    println!("Type your queries or 'quit' to exit.");

    loop {
        match rl.readline("\nQuery: ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);
                if input.eq_ignore_ascii_case("quit") {
                    break;
                }
                handle_input(agent, session, input).await;
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                error!(error = %e, "Readline error");
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history_file) {
        warn!(error = %e, "Failed to save history");
    }
    Ok(())
}

/// Run one input and print the model's text replies
async fn handle_input(agent: &Pilot, session: &mut Session, input: &str) {
    let start = session.transcript.len();
    let result = agent.run(session, input, None).await;

    for entry in &session.transcript.entries()[start..] {
        if let Entry::AssistantText { text } = entry {
            println!("{}", text);
        }
    }

    match result {
        Ok(outcome) if outcome.termination == Termination::IterationCap => {
            warn!(iterations = outcome.iterations, "Stopped at iteration cap");
            println!("[stopped after {} model calls]", outcome.iterations);
        }
        Ok(outcome) => {
            info!(iterations = outcome.iterations, "Query complete");
        }
        Err(e) => {
            error!(session = %session.id, error = %e, "Query failed, starting a new session");
            println!("[error] {}", e);
            *session = Session::new();
        }
    }
}
