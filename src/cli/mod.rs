pub mod config;
pub mod init;
pub mod load;
pub mod status;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "farmacia",
    about = "Load pharmacy inventory movement spreadsheets into SQLite."
)]
pub struct Cli {
    /// Settings file (default: ~/.config/farmacia/settings.json)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a spreadsheet into the store (the default when no command is given).
    Load {
        /// Spreadsheet to load (.xlsx, .xls, .ods or .csv)
        file: Option<String>,
        /// Path to the SQLite store
        #[arg(long)]
        db: Option<String>,
        /// Worksheet name (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Create the store tables without loading anything.
    Init {
        /// Path to the SQLite store
        #[arg(long)]
        db: Option<String>,
    },
    /// Show row counts and recent loads.
    Status {
        /// Path to the SQLite store
        #[arg(long)]
        db: Option<String>,
    },
    /// Save default paths to the settings file.
    Config {
        /// Default spreadsheet path
        #[arg(long)]
        input: Option<String>,
        /// Default store path
        #[arg(long)]
        db: Option<String>,
        /// Default worksheet name
        #[arg(long)]
        sheet: Option<String>,
    },
}
