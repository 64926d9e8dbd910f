//! Command-line interface for metarr.

mod commands;

use clap::{Parser, Subcommand};

pub use commands::{cmd_episode, cmd_reconcile, cmd_series};

/// Metarr - TV series metadata lookup cache
/// Looks shows up on TheTVDB and serves repeats from a local cache
#[derive(Parser)]
#[command(name = "metarr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Look up a series by name or TVDB id
    #[command(alias = "s")]
    Series {
        /// Series name to look up
        name: Option<String>,

        /// TVDB id of the series
        #[arg(long)]
        id: Option<i32>,

        /// Only use the local cache, never the network
        #[arg(long)]
        cache_only: bool,
    },

    /// Look up an episode of a series
    #[command(alias = "e")]
    Episode {
        /// Series name to look up
        name: Option<String>,

        /// TVDB id of the series
        #[arg(long)]
        id: Option<i32>,

        /// Aired season number
        #[arg(long, short)]
        season: Option<i32>,

        /// Aired episode number
        #[arg(long, short)]
        episode: Option<i32>,

        /// Absolute episode number
        #[arg(long, short)]
        absolute: Option<i32>,

        /// Only use the local cache, never the network
        #[arg(long)]
        cache_only: bool,
    },

    /// Run the expiry reconciliation pass now
    Reconcile,

    /// Create a default config file
    Init,
}
