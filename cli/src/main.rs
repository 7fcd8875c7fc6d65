use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use switchboard_cli::build_dispatcher;
use switchboard_cli::commands;
use switchboard_cli::commands::OutputFormat;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(about = "Dispatch free-text requests to task agents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered agents and routing rules
    List {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Run one agent by name
    Run {
        /// Name of the agent to run
        agent: String,

        /// Argument as key=value; values are parsed as JSON when possible
        #[arg(short, long = "arg", value_parser = commands::parse_argument)]
        args: Vec<(String, serde_json::Value)>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Route free text to the matching agent
    Route {
        /// Text to route
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Run a JSON array of {"agent", "arguments"} requests concurrently
    Batch {
        /// Path to the request file
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Ping every registered agent
    Health,

    /// Read requests line by line from stdin
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.verbose {
        "switchboard=debug,switchboard_core=debug,switchboard_cli=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let dispatcher = build_dispatcher(cli.config.as_deref()).await?;

    match cli.command {
        Commands::List { format } => commands::list_agents(&dispatcher, format)?,
        Commands::Run { agent, args, format } => {
            commands::run_agent(&dispatcher, &agent, args, format).await?;
        }
        Commands::Route { text, format } => {
            commands::route_text(&dispatcher, &text.join(" "), format).await?;
        }
        Commands::Batch { file, format } => {
            commands::run_batch(&dispatcher, &file, format).await?;
        }
        Commands::Health => commands::check_health(&dispatcher).await?,
        Commands::Chat => commands::chat(&dispatcher).await?,
    }

    Ok(())
}
