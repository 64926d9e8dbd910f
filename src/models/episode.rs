use crate::entities::episode;
use serde::Serialize;
use std::fmt::Write as _;

/// Selects an episode within a series by absolute number and/or
/// season + episode number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpisodeFilter {
    pub absolute_number: Option<i32>,
    pub season_number: Option<i32>,
    pub episode_number: Option<i32>,
}

impl EpisodeFilter {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.absolute_number.is_none()
            && self.season_number.is_none()
            && self.episode_number.is_none()
    }

    /// Query parameters for the remote `series/{id}/episodes/query` call.
    #[must_use]
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(absolute) = self.absolute_number {
            params.push(("absoluteNumber".to_string(), absolute.to_string()));
        }
        if let Some(season) = self.season_number {
            params.push(("airedSeason".to_string(), season.to_string()));
        }
        if let Some(episode) = self.episode_number {
            params.push(("airedEpisode".to_string(), episode.to_string()));
        }
        params
    }

    /// Human-readable description for log and error messages.
    #[must_use]
    pub fn describe(&self, series_name: &str) -> String {
        let mut description = series_name.to_string();
        if let Some(absolute) = self.absolute_number {
            let _ = write!(description, " absNo: {absolute}");
        }
        if let Some(season) = self.season_number {
            let _ = write!(description, " s{season}");
        }
        if let Some(episode) = self.episode_number {
            let _ = write!(description, " e{episode}");
        }
        description
    }
}

/// Flat serializable view of a cached episode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeView {
    pub id: i32,
    pub expired: bool,
    pub last_updated: String,
    pub season_number: i32,
    pub episode_number: i32,
    pub absolute_number: Option<i32>,
    pub episode_name: Option<String>,
    pub overview: Option<String>,
    pub director: Option<String>,
    pub rating: f64,
    pub image: Option<String>,
    pub first_aired: Option<String>,
    pub series_id: i32,
}

impl EpisodeView {
    #[must_use]
    pub fn new(episode: &episode::Model, banner_base: &str) -> Self {
        Self {
            id: episode.id,
            expired: episode.expired,
            last_updated: super::series::format_timestamp(episode.last_updated),
            season_number: episode.season_number,
            episode_number: episode.episode_number,
            absolute_number: episode.absolute_number,
            episode_name: episode.name.clone(),
            overview: episode.overview.clone(),
            director: episode.director.clone(),
            rating: episode.rating,
            image: episode
                .image
                .as_deref()
                .filter(|i| !i.is_empty())
                .map(|i| format!("{banner_base}{i}")),
            first_aired: episode.first_aired.clone(),
            series_id: episode.series_id,
        }
    }
}
