use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "tabkeep", version, about = "Inspect and edit the stored tab snapshot")]
pub struct Cli {
    /// Database file (default: the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Summarize the stored snapshot
    Show,
    /// Write the snapshot page to a file
    Render {
        #[arg(long)]
        out: PathBuf,
    },
    /// Print the snapshot document as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the stored snapshot with a JSON document
    Import { file: PathBuf },
    /// Remove every tab with this URL from the stored snapshot
    DeleteTab { url: String },
}
