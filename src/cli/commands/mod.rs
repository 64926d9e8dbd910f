mod episode;
mod reconcile;
mod series;

pub use episode::cmd_episode;
pub use reconcile::cmd_reconcile;
pub use series::cmd_series;

use crate::clients::tvdb::{TvdbClient, TvdbConfig};
use crate::config::Config;
use crate::db::Store;
use crate::services::LookupService;
use std::sync::Arc;

pub(crate) async fn build_lookup_service(config: &Config) -> anyhow::Result<LookupService> {
    config.validate()?;

    let store = Store::new(&config.general.database_path).await?;
    let tvdb = Arc::new(TvdbClient::new(
        TvdbConfig {
            base_url: config.tvdb.base_url.clone(),
            banner_url: config.tvdb.banner_url.clone(),
            api_key: config.tvdb.api_key.clone(),
            username: config.tvdb.username.clone(),
            password: config.tvdb.password.clone(),
            request_timeout_seconds: config.tvdb.request_timeout_seconds,
        },
        store.clone(),
    ));

    Ok(LookupService::new(store, tvdb))
}
