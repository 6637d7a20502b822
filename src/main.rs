use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use flashdeck::app::command::{Command, ParseResult, parse_command};
use flashdeck::progress::SystemClock;
use flashdeck::store::{self, JsonFileStore, ProgressStore};
use flashdeck::{App, Config, Identity};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "flashdeck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// User to study as
    #[arg(short, long, global = true, default_value = "guest")]
    user: String,

    /// Grant access to every subject
    #[arg(long, global = true)]
    admin: bool,

    /// Subject the user is entitled to (repeatable)
    #[arg(long = "subject", global = true)]
    subjects: Vec<u32>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Complete one or more cards in a topic
    Study {
        /// Topic id, e.g. mechanics
        topic: String,
        /// Card indices, starting at 0
        #[arg(required = true)]
        indices: Vec<u32>,
    },
    /// Show points, level, streak and today's challenge
    Stats,
    /// List earned and locked achievements
    Achievements,
    /// List topics and completion
    Topics,
    /// Send a deck back to its first card
    Restart {
        topic: String,
    },
    /// Bookmark a card
    Save {
        topic: String,
        index: u32,
        /// Note to keep with the card
        #[arg(short, long)]
        note: Option<String>,
    },
    /// List bookmarked cards
    Saved,
    /// Remove a bookmark
    Unsave {
        id: u64,
    },
    /// Show the leaderboard
    Leaderboard,
    /// Start an interactive study shell
    Shell,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Study { topic, indices } => Command::Study { topic, indices },
            Commands::Stats => Command::Stats,
            Commands::Achievements => Command::Achievements,
            Commands::Topics => Command::Topics,
            Commands::Restart { topic } => Command::Restart(topic),
            Commands::Save { topic, index, note } => Command::Save { topic, index, note },
            Commands::Saved => Command::Saved,
            Commands::Unsave { id } => Command::Unsave(id),
            Commands::Leaderboard => Command::Leaderboard,
            Commands::Shell => Command::Nop,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flashdeck=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    let (store, worker) = store::sync::spawn(JsonFileStore::new(config.progress_dir()?));
    let identity = Identity::new(cli.user, cli.admin, cli.subjects);

    let result = run(App::new(config, identity, store, SystemClock), cli.command).await;

    // Every store handle is gone once the app is dropped, so the worker drains and stops
    let report = worker.join().await;
    tracing::debug!("Sync finished: {} saved, {} failed", report.saved, report.failures);
    if report.unsynced > 0 {
        eprintln!("warning: progress for {} user(s) could not be saved", report.unsynced);
    }

    result
}

async fn run<S: ProgressStore>(app: Result<App<S>>, command: Option<Commands>) -> Result<()> {
    let mut app = app?;

    let greeting = app.start();
    if !greeting.is_empty() {
        println!("{}", greeting);
    }

    match command {
        None | Some(Commands::Shell) => shell(&mut app).await,
        Some(command) => {
            let output = app.execute(command.into())?;
            if !output.is_empty() {
                println!("{}", output);
            }
            Ok(())
        }
    }
}

/// Read commands from stdin until EOF or quit
async fn shell<S: ProgressStore>(app: &mut App<S>) -> Result<()> {
    println!("Studying as {}. Type 'help' for commands.", app.identity().user_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            ParseResult::Ok(Command::Quit) => break,
            ParseResult::Ok(command) => match app.execute(command) {
                Ok(output) if output.is_empty() => {}
                Ok(output) => println!("{}", output),
                Err(e) => println!("error: {:#}", e),
            },
            ParseResult::UnknownCommand(cmd) => {
                println!("Unknown command '{}'. Type 'help' for commands.", cmd)
            }
            ParseResult::MissingArgument(cmd) => println!("'{}' needs more arguments", cmd),
            ParseResult::InvalidArgument(arg) => println!("Not a card number: {}", arg),
        }
    }

    Ok(())
}
