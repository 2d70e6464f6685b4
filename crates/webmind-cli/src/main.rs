//! Webmind CLI - inspect the host and drive the local model lifecycle.

use clap::{Parser, Subcommand};

mod commands;

/// Webmind - local model management for the popup assistant
#[derive(Parser)]
#[command(name = "webmind")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate graphics memory and recommend a model
    Detect {
        /// System memory in GB (read from the host when omitted)
        #[arg(long)]
        memory: Option<f64>,
        /// Pretend no graphics API is available
        #[arg(long)]
        no_gpu: bool,
        /// Adapter vendor, e.g. "apple" or "nvidia"
        #[arg(long)]
        vendor: Option<String>,
        /// Adapter architecture, e.g. "metal-3"
        #[arg(long)]
        arch: Option<String>,
        /// Adapter device name
        #[arg(long)]
        device: Option<String>,
        /// Maximum buffer size in bytes
        #[arg(long)]
        max_buffer: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the available models
    Models {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the persisted model state
    State,

    /// Show or toggle the UI theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },

    /// Load a model and make it the active one
    Load {
        /// Model id (see `webmind models`)
        id: String,
    },

    /// Unload the active model
    Unload,

    /// Enable or disable the selected model
    Toggle,

    /// Send one message to the active model
    Chat {
        /// Message text
        message: String,
    },

    /// Run the background service, reading JSON requests from stdin
    Serve,
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Switch between light and dark
    Toggle,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "warn" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| miette::miette!("Failed to start async runtime: {}", e))?;

    match cli.command {
        Commands::Detect {
            memory,
            no_gpu,
            vendor,
            arch,
            device,
            max_buffer,
            json,
        } => {
            let flags = commands::detect::DetectFlags {
                memory,
                no_gpu,
                vendor,
                arch,
                device,
                max_buffer,
            };
            runtime.block_on(commands::detect::run(flags, json))
        }
        Commands::Models { json } => commands::models::run(json),
        Commands::State => runtime.block_on(commands::state::show()),
        Commands::Theme { action } => match action {
            None => runtime.block_on(commands::state::theme()),
            Some(ThemeAction::Toggle) => runtime.block_on(commands::state::toggle_theme()),
        },
        Commands::Load { id } => runtime.block_on(commands::lifecycle::load(&id)),
        Commands::Unload => runtime.block_on(commands::lifecycle::unload()),
        Commands::Toggle => runtime.block_on(commands::lifecycle::toggle()),
        Commands::Chat { message } => runtime.block_on(commands::lifecycle::chat(&message)),
        Commands::Serve => runtime.block_on(commands::serve::run()),
    }
}
