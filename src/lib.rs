pub mod cli;
pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::LookupError;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Commands::Series {
            name,
            id,
            cache_only,
        } => cli::cmd_series(&config, name.as_deref(), id, cache_only).await,

        cli::Commands::Episode {
            name,
            id,
            season,
            episode,
            absolute,
            cache_only,
        } => {
            let filter = models::episode::EpisodeFilter {
                absolute_number: absolute,
                season_number: season,
                episode_number: episode,
            };
            cli::cmd_episode(&config, name.as_deref(), id, filter, cache_only).await
        }

        cli::Commands::Reconcile => cli::cmd_reconcile(&config).await,

        cli::Commands::Init => {
            let path = Config::create_default_if_missing()?;
            println!("✓ Config file ready at {}. Set tvdb.api_key before use.", path.display());
            Ok(())
        }
    }
}
