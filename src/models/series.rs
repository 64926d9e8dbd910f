use crate::entities::series;
use chrono::DateTime;
use serde::Serialize;

/// Flat serializable view of a cached series, with dates formatted and
/// image references expanded to full banner URLs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesView {
    pub tvdb_id: i32,
    pub last_updated: String,
    pub expired: bool,
    pub series_name: String,
    pub language: Option<String>,
    pub rating: f64,
    pub status: Option<String>,
    pub runtime: i32,
    pub airs_time: Option<String>,
    pub airs_dayofweek: Option<String>,
    pub content_rating: Option<String>,
    pub network: Option<String>,
    pub overview: Option<String>,
    pub imdb_id: Option<String>,
    pub zap2it_id: Option<String>,
    pub banner: Option<String>,
    pub posters: Vec<String>,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub first_aired: Option<String>,
}

impl SeriesView {
    #[must_use]
    pub fn new(
        series: &series::Model,
        genres: Vec<String>,
        actors: Vec<String>,
        posters: Vec<String>,
        banner_base: &str,
    ) -> Self {
        Self {
            tvdb_id: series.id,
            last_updated: format_timestamp(series.last_updated),
            expired: series.expired,
            series_name: series.name.clone(),
            language: series.language.clone(),
            rating: series.rating,
            status: series.status.clone(),
            runtime: series.runtime,
            airs_time: series.airs_time.clone(),
            airs_dayofweek: series.airs_dayofweek.clone(),
            content_rating: series.content_rating.clone(),
            network: series.network.clone(),
            overview: series.overview.clone(),
            imdb_id: series.imdb_id.clone(),
            zap2it_id: series.zap2it_id.clone(),
            banner: series
                .banner
                .as_deref()
                .filter(|b| !b.is_empty())
                .map(|b| format!("{banner_base}{b}")),
            posters: posters
                .iter()
                .map(|p| format!("{banner_base}{p}"))
                .collect(),
            genres,
            actors,
            first_aired: series.first_aired.clone(),
        }
    }
}

pub(crate) fn format_timestamp(epoch_seconds: i64) -> String {
    DateTime::from_timestamp(epoch_seconds, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_series() -> series::Model {
        series::Model {
            id: 77398,
            last_updated: 1_462_425_405,
            expired: false,
            name: "X-Files".to_string(),
            language: Some("en".to_string()),
            rating: 9.1,
            status: Some("Ended".to_string()),
            runtime: 45,
            airs_time: Some("8:00 PM".to_string()),
            airs_dayofweek: Some("Monday".to_string()),
            content_rating: Some("TV-14".to_string()),
            network: Some("FOX".to_string()),
            overview: Some("Mulder and Scully".to_string()),
            imdb_id: Some("tt0106179".to_string()),
            zap2it_id: Some("EP00080955".to_string()),
            banner: Some("graphical/77398-g.jpg".to_string()),
            first_aired: Some("1993-09-10".to_string()),
            aliases: Some("[]".to_string()),
            actors: None,
            posters: None,
        }
    }

    #[test]
    fn view_expands_image_urls() {
        let view = SeriesView::new(
            &sample_series(),
            vec!["Drama".to_string()],
            vec!["David Duchovny".to_string()],
            vec!["posters/77398-1.jpg".to_string()],
            "https://thetvdb.com/banners/",
        );

        assert_eq!(
            view.banner.as_deref(),
            Some("https://thetvdb.com/banners/graphical/77398-g.jpg")
        );
        assert_eq!(
            view.posters,
            vec!["https://thetvdb.com/banners/posters/77398-1.jpg"]
        );
        assert_eq!(view.genres, vec!["Drama"]);
    }

    #[test]
    fn view_formats_last_updated() {
        let view = SeriesView::new(
            &sample_series(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            "https://thetvdb.com/banners/",
        );
        assert_eq!(view.last_updated, "2016-05-05 05:16:45");
    }

    #[test]
    fn empty_banner_is_omitted() {
        let mut series = sample_series();
        series.banner = Some(String::new());
        let view = SeriesView::new(
            &series,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            "https://thetvdb.com/banners/",
        );
        assert!(view.banner.is_none());
    }
}
