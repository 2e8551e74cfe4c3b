use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(name = "memvocab", version, about = "MemVocab vocabulary trainer CLI")]
pub struct Cli {
    /// Store file path (defaults to the platform data dir)
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Keep everything in memory; nothing touches the disk
    #[arg(long)]
    pub ephemeral: bool,

    /// Skip the simulated seeding delay
    #[arg(long)]
    pub no_delay: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Deck operations
    #[command(subcommand)]
    Deck(DeckCmd),
    /// Card operations
    #[command(subcommand)]
    Card(CardCmd),
    /// Ensure the default deck and its cards exist
    Seed,
    /// Replace a deck's card set from a JSON array
    Import {
        #[arg(long)]
        deck: String,
        path: PathBuf,
    },
    /// Write a deck's card set as a JSON array
    Export {
        #[arg(long)]
        deck: String,
        path: PathBuf,
    },
    /// Print live snapshots as the store changes, until Ctrl-C
    Watch {
        /// Watch one deck's cards instead of the deck list
        #[arg(long)]
        deck: Option<String>,
    },
}

#[derive(Debug, Subcommand, Clone)]
pub enum DeckCmd {
    List,
    Add(DeckAdd),
    Rm { deck_id: String },
    Edit(DeckEdit),
    Search { query: String },
}

#[derive(Debug, Args, Clone)]
pub struct DeckAdd {
    #[arg(long)]
    pub topic: String,
    #[arg(long = "from")]
    pub language_from: String,
    #[arg(long = "to")]
    pub language_to: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub prompt: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct DeckEdit {
    pub deck_id: String,
    #[arg(long)]
    pub topic: Option<String>,
    #[arg(long = "from")]
    pub language_from: Option<String>,
    #[arg(long = "to")]
    pub language_to: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub prompt: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CardCmd {
    List {
        #[arg(long)]
        deck: String,
    },
    Add(CardAdd),
    Rm {
        card_id: String,
    },
    Edit(CardEdit),
    Search {
        query: String,
        #[arg(long)]
        deck: Option<String>,
    },
}

#[derive(Debug, Args, Clone)]
pub struct CardAdd {
    #[arg(long)]
    pub deck: String,
    #[arg(long)]
    pub source: String,
    #[arg(long)]
    pub target: String,
    /// Defaults to the deck's source language
    #[arg(long)]
    pub source_lang: Option<String>,
    /// Defaults to the deck's target language
    #[arg(long)]
    pub target_lang: Option<String>,
    #[arg(long, default_value = "")]
    pub pronunciation: String,
    #[arg(long)]
    pub remark: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct CardEdit {
    pub card_id: String,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub target: Option<String>,
    #[arg(long)]
    pub source_lang: Option<String>,
    #[arg(long)]
    pub target_lang: Option<String>,
    #[arg(long)]
    pub pronunciation: Option<String>,
    #[arg(long)]
    pub remark: Option<String>,
}
