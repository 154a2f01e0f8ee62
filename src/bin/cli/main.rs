mod app;
mod commands;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "recall", about = "Spaced-repetition flashcards", version)]
struct Cli {
    /// Deck file to use (default: from config, else the data directory)
    #[arg(long, global = true)]
    deck: Option<PathBuf>,

    /// Config file (default: <config dir>/recall/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Review the cards that are due today
    Study {
        /// Maximum number of cards
        #[arg(long)]
        limit: Option<usize>,
        /// Ask the selected cards in random order
        #[arg(long)]
        shuffle: bool,
    },

    /// Add a card
    Add {
        /// Question side
        front: String,
        /// Answer side (use "-" to read from stdin)
        back: Option<String>,
    },

    /// List cards
    List {
        /// Only cards due today
        #[arg(long)]
        due: bool,
    },

    /// Show one card
    Show {
        /// Card id or unique id prefix
        id: String,
    },

    /// Change the text of a card
    Edit {
        /// Card id or unique id prefix
        id: String,
        /// New question side
        #[arg(long)]
        front: Option<String>,
        /// New answer side
        #[arg(long)]
        back: Option<String>,
    },

    /// Delete a card
    Delete {
        /// Card id or unique id prefix
        id: String,
    },

    /// Deck statistics
    Stats,

    /// Revert the latest change
    Undo,

    /// Reapply the latest undone change
    Redo,
}

/// Read the answer from `input` (stdin) when given as "-"
fn resolve_back(back: Option<String>, input: &mut impl Read) -> anyhow::Result<Option<String>> {
    match back.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            input
                .read_to_string(&mut buf)
                .context("Failed to read the answer from stdin")?;
            Ok(Some(buf))
        }
        _ => Ok(back),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut app = app::App::new(cli.deck, cli.config.as_deref())?;

    match cli.command {
        Command::Study { limit, shuffle } => {
            commands::study::run(&mut app, limit, shuffle, &cli.format)?;
        }
        Command::Add { front, back } => {
            let back = resolve_back(back, &mut std::io::stdin())?.unwrap_or_default();
            commands::cards::run_add(&mut app, &front, &back, &cli.format)?;
        }
        Command::List { due } => {
            commands::cards::run_list(&app, due, &cli.format)?;
        }
        Command::Show { id } => {
            commands::cards::run_show(&app, &id, &cli.format)?;
        }
        Command::Edit { id, front, back } => {
            commands::cards::run_edit(&mut app, &id, front.as_deref(), back.as_deref(), &cli.format)?;
        }
        Command::Delete { id } => {
            commands::cards::run_delete(&mut app, &id, &cli.format)?;
        }
        Command::Stats => {
            commands::stats::run(&app, &cli.format)?;
        }
        Command::Undo => {
            commands::history::run_undo(&mut app, &cli.format)?;
        }
        Command::Redo => {
            commands::history::run_redo(&mut app, &cli.format)?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.downcast_ref::<app::RecoveryDeclined>().is_some() => {
            eprintln!("{}", err);
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
