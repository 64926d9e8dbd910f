//! Series and episode lookup orchestration.
//!
//! Lookups are served from the local cache when possible; a miss or an
//! expired record goes to TheTVDB and the result is merged back into the
//! store. Refresh failures on already-cached records are swallowed and the
//! stale copy is returned with `degraded` set.

use crate::clients::tvdb::{EpisodePayload, SearchEntry, SeriesPayload, TvdbClient};
use crate::db::Store;
use crate::entities::{episode, series};
use crate::error::LookupError;
use crate::models::episode::{EpisodeFilter, EpisodeView};
use crate::models::series::SeriesView;
use crate::services::reconcile::ExpiryReconciler;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A lookup result. `degraded` means the record is served stale because a
/// refresh attempt failed; callers that care about freshness can check it.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub record: T,
    pub degraded: bool,
}

#[derive(Clone)]
pub struct LookupService {
    store: Store,
    tvdb: Arc<TvdbClient>,
    reconciler: ExpiryReconciler,
}

impl LookupService {
    #[must_use]
    pub fn new(store: Store, tvdb: Arc<TvdbClient>) -> Self {
        Self {
            reconciler: ExpiryReconciler::new(store.clone(), Arc::clone(&tvdb)),
            store,
            tvdb,
        }
    }

    #[must_use]
    pub const fn reconciler(&self) -> &ExpiryReconciler {
        &self.reconciler
    }

    /// Looks up a series by name or TVDB id.
    ///
    /// With `cache_only` no network call is made and a cache miss fails
    /// with [`LookupError::NotFound`].
    pub async fn resolve_series(
        &self,
        name: Option<&str>,
        id: Option<i32>,
        cache_only: bool,
    ) -> Result<Resolved<series::Model>, LookupError> {
        if name.is_none() && id.is_none() {
            return Err(LookupError::InvalidArgument(
                "a series name or tvdb id is required",
            ));
        }

        let description = series_query_description(name, id);
        debug!(query = %description, "Looking up series");

        let mut series = match id {
            Some(id) => self.store.get_series(id).await?,
            None => None,
        };
        if series.is_none()
            && let Some(name) = name
            && let Some(found) = self.store.find_search_result(name).await?
            && let Some(series_id) = found.series_id
        {
            series = self.store.get_series(series_id).await?;
        }

        let mut degraded = false;
        let series = if let Some(cached) = series {
            let mut current = cached;
            if cache_only {
                debug!(query = %description, "Series information restored from cache");
            } else {
                // The reconciliation pass may flip this record's expired
                // flag, so reload before checking it.
                if let Err(err) = self.reconciler.mark_expired().await {
                    warn!(error = %err, "Expiry reconciliation failed");
                }
                if let Some(reloaded) = self.store.get_series(current.id).await? {
                    current = reloaded;
                }
                if current.expired {
                    info!(series = %current.name, "Data has expired, refreshing from TVDB");
                    match self.refresh_series(current.id).await {
                        Ok(updated) => current = updated,
                        Err(err) => {
                            warn!(
                                error = %err,
                                "Error refreshing from TVDB, using cached data"
                            );
                            degraded = true;
                        }
                    }
                }
            }
            Some(current)
        } else if cache_only {
            return Err(LookupError::NotFound(format!(
                "series {description} not found in cache"
            )));
        } else {
            debug!(query = %description, "Series not in cache, looking up from TVDB");
            if let Some(id) = id {
                Some(self.refresh_series(id).await?)
            } else if let Some(name) = name {
                let series_id = self.find_series_id(name).await?;
                let record = match self.store.get_series(series_id).await? {
                    Some(existing) => existing,
                    None => self.refresh_series(series_id).await?,
                };
                self.store
                    .upsert_search_result(name, Some(series_id))
                    .await?;
                Some(record)
            } else {
                None
            }
        };

        let series = series.ok_or_else(|| {
            LookupError::NotFound(format!("no results from TVDB for {description}"))
        })?;
        if series.name.is_empty() {
            return Err(LookupError::InvalidData(
                "TVDB series result has no name".to_string(),
            ));
        }

        Ok(Resolved {
            record: series,
            degraded,
        })
    }

    /// Looks up an episode by owning series (name or id) plus number
    /// filters. A remote query requires at least one number filter;
    /// fetching an arbitrary "first" episode is never done.
    pub async fn resolve_episode(
        &self,
        name: Option<&str>,
        id: Option<i32>,
        filter: EpisodeFilter,
        cache_only: bool,
    ) -> Result<Resolved<episode::Model>, LookupError> {
        let resolved_series = self.resolve_series(name, id, cache_only).await?;
        let mut degraded = resolved_series.degraded;
        let series = resolved_series.record;

        let description = filter.describe(&series.name);

        let episode = match self.store.find_episode(series.id, &filter).await? {
            Some(cached) if cached.expired && !cache_only => {
                info!(episode = %description, "Episode data has expired, refreshing from TVDB");
                match self.refresh_episode(cached.id, series.id).await {
                    Ok(updated) => updated,
                    Err(err) => {
                        warn!(
                            error = %err,
                            "Error refreshing episode from TVDB, using cached data"
                        );
                        degraded = true;
                        cached
                    }
                }
            }
            Some(cached) => {
                debug!(episode = %description, "Using episode info from cache");
                cached
            }
            None => {
                if cache_only {
                    return Err(LookupError::NotFound(format!(
                        "episode {description} not found in cache"
                    )));
                }
                if filter.is_empty() {
                    return Err(LookupError::InvalidArgument(
                        "an episode number (season/episode or absolute) is required",
                    ));
                }
                debug!(episode = %description, "Episode not in cache, looking up from TVDB");
                let results = match self
                    .tvdb
                    .series_episodes(series.id, &filter.query_params())
                    .await
                {
                    Ok(results) => results,
                    Err(err) if err.is_not_found() => Vec::new(),
                    Err(err) => return Err(err),
                };
                let Some(first) = results.first() else {
                    return Err(LookupError::NotFound(format!(
                        "no results found for {description}"
                    )));
                };
                match self.store.get_episode(first.id).await? {
                    Some(existing) if !existing.expired => existing,
                    _ => self.refresh_episode(first.id, series.id).await?,
                }
            }
        };

        Ok(Resolved {
            record: episode,
            degraded,
        })
    }

    /// Fetches series detail from TVDB and overwrites the cached record.
    /// Also relinks genres, memoizes search strings for the name and all
    /// aliases, and resets the lazy actor/poster caches.
    pub async fn refresh_series(&self, id: i32) -> Result<series::Model, LookupError> {
        let payload = self.tvdb.series(id).await?;
        let record = series_record_from_payload(&payload)?;

        self.store.upsert_series(record.clone()).await?;
        self.store
            .set_series_genres(record.id, &payload.genre.clone().unwrap_or_default())
            .await?;

        let mut names = BTreeSet::new();
        names.insert(record.name.to_lowercase());
        if let Some(aliases) = &payload.aliases {
            for alias in aliases {
                names.insert(alias.to_lowercase());
            }
        }
        for name in names {
            self.store
                .upsert_search_result(&name, Some(record.id))
                .await?;
        }

        Ok(record)
    }

    /// Fetches episode detail from TVDB and overwrites the cached record.
    pub async fn refresh_episode(
        &self,
        id: i32,
        series_id: i32,
    ) -> Result<episode::Model, LookupError> {
        let payload = self.tvdb.episode(id).await?;
        let record = episode_record_from_payload(series_id, &payload);
        self.store.upsert_episode(record.clone()).await?;
        Ok(record)
    }

    /// Actor names, fetched from TVDB on first access and cached on the
    /// series row afterwards.
    pub async fn series_actors(
        &self,
        series: &series::Model,
    ) -> Result<Vec<String>, LookupError> {
        if let Some(raw) = &series.actors {
            return serde_json::from_str(raw).map_err(|e| {
                LookupError::InvalidData(format!(
                    "corrupt actor cache for series {}: {e}",
                    series.id
                ))
            });
        }

        debug!(series = %series.name, "Looking up actors for series");
        let actors = self.tvdb.series_actors(series.id).await?;
        let names: Vec<String> = actors.into_iter().map(|a| a.name).collect();

        let raw =
            serde_json::to_string(&names).map_err(|e| LookupError::InvalidData(e.to_string()))?;
        self.store.set_series_actors(series.id, &raw).await?;

        Ok(names)
    }

    /// Top-5 poster file names, fetched on first access and cached.
    pub async fn series_posters(
        &self,
        series: &series::Model,
    ) -> Result<Vec<String>, LookupError> {
        if let Some(raw) = &series.posters {
            return serde_json::from_str(raw).map_err(|e| {
                LookupError::InvalidData(format!(
                    "corrupt poster cache for series {}: {e}",
                    series.id
                ))
            });
        }

        debug!(series = %series.name, "Getting top 5 posters for series");
        let posters = self.tvdb.series_posters(series.id).await?;
        let files: Vec<String> = posters.into_iter().take(5).map(|p| p.file_name).collect();

        let raw =
            serde_json::to_string(&files).map_err(|e| LookupError::InvalidData(e.to_string()))?;
        self.store.set_series_posters(series.id, &raw).await?;

        Ok(files)
    }

    /// Builds the flat serializable view of a series. Unless `cache_only`,
    /// the lazy actor/poster fields are fetched on demand.
    pub async fn series_view(
        &self,
        series: &series::Model,
        cache_only: bool,
    ) -> Result<SeriesView, LookupError> {
        let genres = self.store.genres_for_series(series.id).await?;
        let (actors, posters) = if cache_only {
            (
                parse_cached_list(series.actors.as_deref()),
                parse_cached_list(series.posters.as_deref()),
            )
        } else {
            (
                self.series_actors(series).await?,
                self.series_posters(series).await?,
            )
        };

        Ok(SeriesView::new(
            series,
            genres,
            actors,
            posters,
            self.tvdb.banner_url(),
        ))
    }

    #[must_use]
    pub fn episode_view(&self, episode: &episode::Model) -> EpisodeView {
        EpisodeView::new(episode, self.tvdb.banner_url())
    }

    /// Resolves a series name to a TVDB id via the remote search endpoint.
    async fn find_series_id(&self, name: &str) -> Result<i32, LookupError> {
        let candidates = match self.tvdb.search_series(name).await {
            Ok(candidates) => candidates,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => return Err(err),
        };

        select_series_id(name, &candidates)
            .ok_or_else(|| LookupError::NotFound(format!("no results for `{name}`")))
    }
}

/// An exact case-insensitive name match wins; otherwise the candidate with
/// the latest first-aired date is taken.
fn select_series_id(name: &str, candidates: &[SearchEntry]) -> Option<i32> {
    let name = name.to_lowercase();
    let mut dated: Vec<(&str, i32)> = Vec::new();

    for candidate in candidates {
        if let Some(series_name) = &candidate.series_name
            && series_name.to_lowercase() == name
        {
            return Some(candidate.id);
        }
        if let Some(first_aired) = candidate.first_aired.as_deref().filter(|d| !d.is_empty()) {
            dated.push((first_aired, candidate.id));
        }
    }

    dated.sort_by(|a, b| b.0.cmp(a.0));
    dated.first().map(|(_, id)| *id)
}

fn series_query_description(name: Option<&str>, id: Option<i32>) -> String {
    format!(
        "<name={}, tvdb_id={}>",
        name.unwrap_or("none"),
        id.map_or_else(|| "none".to_string(), |id| id.to_string())
    )
}

/// Maps a TVDB series detail payload onto a cache record, coercing absent
/// numerics to safe defaults. A payload without a usable name is rejected
/// so transient partial fetches are never persisted.
fn series_record_from_payload(payload: &SeriesPayload) -> Result<series::Model, LookupError> {
    let name = payload
        .series_name
        .clone()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            LookupError::InvalidData(format!("TVDB result for series {} has no name", payload.id))
        })?;

    let aliases = payload.aliases.clone().unwrap_or_default();
    let aliases_json =
        serde_json::to_string(&aliases).map_err(|e| LookupError::InvalidData(e.to_string()))?;

    Ok(series::Model {
        id: payload.id,
        last_updated: payload.last_updated.unwrap_or_default(),
        expired: false,
        name,
        language: Some("en".to_string()),
        rating: payload.site_rating.unwrap_or(0.0),
        status: payload.status.clone(),
        runtime: payload.runtime.unwrap_or(0),
        airs_time: payload.airs_time.clone(),
        airs_dayofweek: payload.airs_day_of_week.clone(),
        content_rating: payload.rating.clone(),
        network: payload.network.clone(),
        overview: payload.overview.clone(),
        imdb_id: payload.imdb_id.clone(),
        zap2it_id: payload.zap2it_id.clone(),
        banner: payload.banner.clone(),
        first_aired: payload.first_aired.clone().filter(|d| !d.is_empty()),
        aliases: Some(aliases_json),
        actors: None,
        posters: None,
    })
}

fn episode_record_from_payload(series_id: i32, payload: &EpisodePayload) -> episode::Model {
    episode::Model {
        id: payload.id,
        series_id,
        expired: false,
        last_updated: payload.last_updated.unwrap_or_default(),
        season_number: payload.aired_season.unwrap_or(0),
        episode_number: payload.aired_episode_number.unwrap_or(0),
        absolute_number: payload.absolute_number,
        name: payload.episode_name.clone(),
        overview: payload.overview.clone(),
        rating: payload.site_rating.unwrap_or(0.0),
        director: payload.director.clone(),
        image: payload.filename.clone(),
        first_aired: payload.first_aired.clone().filter(|d| !d.is_empty()),
    }
}

fn parse_cached_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|r| serde_json::from_str(r).ok())
        .unwrap_or_default()
}
