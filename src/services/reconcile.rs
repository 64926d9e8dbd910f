//! Expiry reconciliation: asks TheTVDB which catalog entries changed since
//! the last check and flips the expired flag on matching local records.

use crate::clients::tvdb::TvdbClient;
use crate::db::Store;
use crate::error::LookupError;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error};

/// Bookkeeping key holding the RFC 3339 timestamp of the last check.
const LAST_CHECK_KEY: &str = "last_check";

/// Minimum time between remote update queries.
const CHECK_INTERVAL_HOURS: i64 = 2;

/// Safety margin subtracted from the last check time, in seconds.
const CHECK_BUFFER_SECONDS: i64 = 60;

/// SQLite limits the number of variables per query, so expired id lists
/// are applied in batches below that ceiling.
const UPDATE_BATCH_SIZE: usize = 900;

#[derive(Clone)]
pub struct ExpiryReconciler {
    store: Store,
    tvdb: Arc<TvdbClient>,
}

impl ExpiryReconciler {
    #[must_use]
    pub const fn new(store: Store, tvdb: Arc<TvdbClient>) -> Self {
        Self { store, tvdb }
    }

    /// Marks series and episodes that changed remotely since the last
    /// check as expired.
    ///
    /// Runs at most once per two-hour window; the first invocation only
    /// records the baseline timestamp. A remote failure is logged and
    /// leaves the last-check timestamp untouched so the next qualifying
    /// call retries.
    pub async fn mark_expired(&self) -> Result<(), LookupError> {
        let now = Utc::now();

        let last_check = self
            .store
            .get_bookkeeping(LAST_CHECK_KEY)
            .await?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|t| t.with_timezone(&Utc));

        let Some(last_check) = last_check else {
            self.store
                .set_bookkeeping(LAST_CHECK_KEY, &now.to_rfc3339())
                .await?;
            return Ok(());
        };

        if now - last_check <= Duration::hours(CHECK_INTERVAL_HOURS) {
            return Ok(());
        }

        let from_time = last_check.timestamp() - CHECK_BUFFER_SECONDS;
        debug!(from_time, "Getting updates from TheTVDB");

        let updates = match self.tvdb.updated_since(from_time).await {
            Ok(updates) => updates,
            Err(err) => {
                error!(error = %err, "Could not get update information from TVDB");
                return Ok(());
            }
        };

        let expired_ids: Vec<i32> = updates.into_iter().map(|u| u.id).collect();

        for chunk in expired_ids.chunks(UPDATE_BATCH_SIZE) {
            let series_marked = self.store.mark_series_expired(chunk).await?;
            let episodes_marked = self.store.mark_episodes_expired(chunk).await?;
            debug!(
                series = series_marked,
                episodes = episodes_marked,
                "Marked records as expired"
            );
        }

        self.store
            .set_bookkeeping(LAST_CHECK_KEY, &now.to_rfc3339())
            .await?;

        Ok(())
    }
}
