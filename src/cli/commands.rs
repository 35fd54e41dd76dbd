use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "twsync", about = concat!("twsync v", env!("CARGO_PKG_VERSION"), " - keep a task wiki and its task store in step"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use this config file instead of the nearest taskwiki.toml
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save edited tasks, refresh from the store, and rewrite the wiki
    Sync(WriteArgs),
    /// Save edited tasks and write their UUIDs into the wiki
    Save(WriteArgs),
    /// Rewrite the wiki from the store, without saving local edits
    Refresh(WriteArgs),
    /// List the task, project and viewport lines of a wiki file
    Show(ReadArgs),
    /// Print the order tasks would be saved in
    Order(ReadArgs),
}

#[derive(Args)]
pub struct WriteArgs {
    /// Wiki file to sync
    pub file: PathBuf,
    /// Print the resulting wiki instead of writing the file
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct ReadArgs {
    /// Wiki file to read
    pub file: PathBuf,
}
