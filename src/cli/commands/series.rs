use crate::config::Config;

pub async fn cmd_series(
    config: &Config,
    name: Option<&str>,
    id: Option<i32>,
    cache_only: bool,
) -> anyhow::Result<()> {
    let lookup = super::build_lookup_service(config).await?;

    let resolved = lookup.resolve_series(name, id, cache_only).await?;
    if resolved.degraded {
        eprintln!("warning: refresh failed, showing cached data");
    }

    let view = lookup.series_view(&resolved.record, cache_only).await?;
    println!("{}", serde_json::to_string_pretty(&view)?);

    Ok(())
}
