use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{ConfigCommand, NoteCommand, OutputFormat, SectionCommand, Workspace};
use whiteboard::config::Config;
use whiteboard::sync::Strategy;

#[derive(Parser)]
#[command(name = "whiteboard")]
#[command(version)]
#[command(about = "A sticky-note whiteboard with server sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Board to operate on (overrides config)
    #[arg(long, short, global = true)]
    board: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the board
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Replace the board with the starter layout
    Init {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Remove every note and section
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Manage notes
    Note(NoteCommand),

    /// Manage sections
    Section(SectionCommand),

    /// Save the board to the server
    Save {
        /// How to resolve a newer server copy: merge, local or remote
        #[arg(long, short, default_value = "merge")]
        strategy: Strategy,
    },

    /// Compare the local copy with the server
    Status,

    /// Replace the local copy with the server's board
    Pull {
        /// Discard unsaved local edits
        #[arg(long, short)]
        force: bool,
    },

    /// Delete the board on the server and locally
    DeleteBoard {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Edit interactively with auto-save
    Session,

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whiteboard=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?.with_board(cli.board);

    let command = match cli.command {
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    if let Commands::Config(cmd) = &command {
        return cmd.run(&config);
    }

    let workspace = Workspace::open(&config)?;
    match command {
        Commands::Show { format } => commands::show(&workspace, &format).await?,
        Commands::Init { force } => commands::init(&workspace, force).await?,
        Commands::Clear { force } => commands::clear(&workspace, force).await?,
        Commands::Note(cmd) => cmd.run(&workspace).await?,
        Commands::Section(cmd) => cmd.run(&workspace).await?,
        Commands::Save { strategy } => commands::save(&workspace, strategy).await?,
        Commands::Status => commands::status(&workspace).await?,
        Commands::Pull { force } => commands::pull(&workspace, force).await?,
        Commands::DeleteBoard { force } => commands::delete_board(&workspace, force).await?,
        Commands::Session => commands::run_session(workspace, &config).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}
