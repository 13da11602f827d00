use anyhow::Result;
use clap::{Parser, Subcommand};
use ollama_agent::agent::{ChatSession, Transcript};
use ollama_agent::llm::{ErrorMode, OllamaClient};
use ollama_agent::tools::ToolRegistry;
use ollama_agent::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ollama-agent")]
#[command(author, version, about = "Chat with a local Ollama model that can call tools", long_about = None)]
#[command(after_help = "Example:\n  ollama-agent -m llama3 -u http://localhost:11434/api/chat chat")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// The URL of the ollama server [default: http://localhost:11434/api/chat]
    #[arg(short, long, global = true)]
    url: Option<String>,

    /// The model to use; must be installed [default: mistral:7b]
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Config file (default: platform config dir, ollama-agent/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report non-200 replies and tool failures instead of swallowing them
    #[arg(long, global = true)]
    strict: bool,

    /// Resend the whole conversation with every request
    #[arg(long, global = true)]
    keep_history: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the LLM
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "ollama_agent=debug"
    } else {
        "ollama_agent=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(url) = cli.url {
        config.client.url = url;
    }
    if let Some(model) = cli.model {
        config.client.model = model;
    }
    if cli.strict {
        config.chat.error_mode = ErrorMode::Strict;
    }
    if cli.keep_history {
        config.chat.keep_history = true;
    }

    match cli.command {
        Commands::Chat => run_chat(config).await?,
    }

    Ok(())
}

async fn run_chat(config: Config) -> Result<()> {
    let tools = ToolRegistry::with_defaults();
    let client = OllamaClient::new(config.client.url.clone(), config.client.model.clone())
        .with_options(config.client.options.clone())
        .with_tools(tools.descriptors())
        .with_error_mode(config.chat.error_mode)
        .with_timeout(config.client.timeout());

    tracing::info!(
        url = %client.url(),
        model = %client.model(),
        error_mode = ?config.chat.error_mode,
        keep_history = config.chat.keep_history,
        "Starting chat"
    );

    let stdout = std::io::stdout();
    Transcript::new(stdout.lock()).banner(client.url(), client.model())?;

    let mut session = ChatSession::new(client, tools, config.chat.session_options());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    session.run(stdin, stdout.lock()).await
}
