use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "janitor")]
#[command(about = "Find and clean up clutter in your cloud drive", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch the drive listing, store it and run analysis
    Sync {
        #[arg(short, long)]
        owner: String,
    },
    /// Run one analysis pass over pending files
    Analyze {
        #[arg(short, long)]
        owner: String,
    },
    /// Show cleanup bundles built from the current recommendations
    Recommendations {
        #[arg(short, long)]
        owner: String,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete files remotely and locally
    Delete {
        #[arg(short, long)]
        owner: String,
        /// Local file ids to delete
        #[arg(conflicts_with = "bundle")]
        ids: Vec<i64>,
        /// Delete every file in a bundle (duplicate, large_file, old_file)
        #[arg(long)]
        bundle: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Print storage totals and analysis progress
    Stats {
        #[arg(short, long)]
        owner: String,
    },
    /// Store the drive access token for an owner
    SetToken {
        #[arg(short, long)]
        owner: String,
        token: String,
    },
    /// Return files stuck in processing back to pending
    ResetStuck {
        #[arg(short, long)]
        owner: String,
        #[arg(long, default_value_t = 30)]
        older_than_minutes: u32,
    },
    /// Print configuration values
    PrintConfig,
    /// Truncate all database tables
    TruncateDb,
}
