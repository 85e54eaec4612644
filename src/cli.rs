use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a translation against ad-hoc reference lines
    Evaluate {
        /// Source-language line shown to the learner
        #[arg(short, long)]
        source: String,

        /// Reference translation
        #[arg(short, long)]
        target: String,

        /// Learner's translation
        #[arg(long)]
        translation: String,

        /// Score locally without calling the remote service
        #[arg(long)]
        offline: bool,
    },

    /// Evaluate a translation of a catalog line and record the attempt
    Practice {
        /// Episode identifier (e.g. friends-s1e1)
        #[arg(short, long)]
        episode: String,

        /// Dialogue index within the episode; defaults to the line after the saved progress
        #[arg(short, long)]
        index: Option<usize>,

        /// Learner's translation
        #[arg(long)]
        translation: String,

        /// Score locally without calling the remote service
        #[arg(long)]
        offline: bool,
    },

    /// List available shows
    Shows,

    /// List episodes of a show
    Episodes {
        /// Show identifier
        #[arg(short, long)]
        show: String,
    },

    /// Show past practice attempts, newest first
    History {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show practice statistics
    Stats,

    /// Show saved progress per show
    Progress {
        /// Only this show
        #[arg(short, long)]
        show: Option<String>,
    },
}
