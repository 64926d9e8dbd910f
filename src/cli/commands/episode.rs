use crate::config::Config;
use crate::models::episode::EpisodeFilter;

pub async fn cmd_episode(
    config: &Config,
    name: Option<&str>,
    id: Option<i32>,
    filter: EpisodeFilter,
    cache_only: bool,
) -> anyhow::Result<()> {
    let lookup = super::build_lookup_service(config).await?;

    let resolved = lookup.resolve_episode(name, id, filter, cache_only).await?;
    if resolved.degraded {
        eprintln!("warning: refresh failed, showing cached data");
    }

    let view = lookup.episode_view(&resolved.record);
    println!("{}", serde_json::to_string_pretty(&view)?);

    Ok(())
}
