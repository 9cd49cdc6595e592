//! Vera CLI — the main entry point.
//!
//! Commands:
//! - `gateway`  — Start the HTTP webhook server
//! - `ask`      — Run one message through the pipeline
//! - `memory`   — Inspect or prune stored profiles and message logs
//! - `config`   — Show, validate, or print default configuration
//! - `status`   — Show the resolved runtime wiring
//! - `welcome`  — Print the introduction and sample prompts

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::ask::AskOptions;

#[derive(Parser)]
#[command(
    name = "vera",
    about = "Vera — link summaries, thread drafts and memory for chat servers",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read configuration from this file instead of ~/.vera/config.toml
    #[arg(long, global = true, env = "VERA_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a single message through the pipeline
    Ask {
        /// The message text
        #[arg(short, long)]
        message: String,

        /// Sender id
        #[arg(long)]
        user: Option<String>,

        /// Sender display name
        #[arg(long)]
        user_name: Option<String>,

        /// Server id
        #[arg(long)]
        server: Option<String>,

        /// Server display name
        #[arg(long)]
        server_name: Option<String>,

        /// Treat the message as addressed to the assistant
        #[arg(long)]
        mentioned: bool,

        /// Also post the result to the configured Discord webhook
        #[arg(long)]
        notify: bool,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or prune memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show system status
    Status,

    /// Print the welcome text and sample prompts
    Welcome {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Most recent messages stored for a server
    Recent {
        #[arg(long, default_value = "global")]
        server: String,

        /// Only messages from this user
        #[arg(long)]
        user: Option<String>,

        #[arg(long, default_value_t = vera_memory::store::DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },

    /// Show a person's profile
    Profile {
        #[arg(long, default_value = "global")]
        server: String,

        #[arg(long)]
        user: String,
    },

    /// Delete a person's profile
    Forget {
        #[arg(long, default_value = "global")]
        server: String,

        #[arg(long)]
        user: String,
    },

    /// Delete a server's message log
    Clear {
        #[arg(long, default_value = "global")]
        server: String,

        /// Required to actually delete
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved configuration (secrets redacted)
    Show,

    /// Print the default configuration as TOML
    Defaults,

    /// Print the config file path
    Path,

    /// Validate the resolved configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Commands that never need a valid config
    match &cli.command {
        Commands::Welcome { json } => return commands::welcome::run(*json),
        Commands::Config { action: ConfigAction::Defaults } => return commands::config_cmd::defaults(),
        Commands::Config { action: ConfigAction::Path } => return commands::config_cmd::path(),
        _ => {}
    }

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Gateway { port } => commands::gateway::run(config, port).await?,
        Commands::Ask {
            message,
            user,
            user_name,
            server,
            server_name,
            mentioned,
            notify,
            json,
        } => {
            let options = AskOptions {
                message,
                user_id: user,
                user_name,
                server_id: server,
                server_name,
                mentioned,
                notify,
                json,
            };
            commands::ask::run(&config, options).await?
        }
        Commands::Memory { action } => match action {
            MemoryAction::Recent { server, user, limit } => {
                commands::memory::recent(&config, &server, user.as_deref(), limit).await?
            }
            MemoryAction::Profile { server, user } => {
                commands::memory::profile(&config, &server, &user).await?
            }
            MemoryAction::Forget { server, user } => {
                commands::memory::forget(&config, &server, &user).await?
            }
            MemoryAction::Clear { server, confirm } => {
                commands::memory::clear(&config, &server, confirm).await?
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(&config)?,
            ConfigAction::Validate => commands::config_cmd::validate(&config)?,
            ConfigAction::Defaults => commands::config_cmd::defaults()?,
            ConfigAction::Path => commands::config_cmd::path()?,
        },
        Commands::Status => commands::status::run(&config)?,
        Commands::Welcome { json } => commands::welcome::run(json)?,
    }

    Ok(())
}
