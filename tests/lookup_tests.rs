//! End-to-end lookup flows against an in-process stub of TheTVDB API.
//!
//! The stub counts hits per endpoint so tests can assert exactly how many
//! remote calls a lookup performed.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Duration, Utc};
use metarr::clients::tvdb::{TvdbClient, TvdbConfig};
use metarr::db::Store;
use metarr::error::LookupError;
use metarr::models::episode::EpisodeFilter;
use metarr::services::LookupService;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const XFILES_ID: i32 = 77398;
const PILOT_EPISODE_ID: i32 = 5313345;

#[derive(Default)]
struct StubState {
    hits: Mutex<HashMap<&'static str, usize>>,
    login_count: AtomicUsize,
    /// When set, authenticated endpoints reject any other bearer token.
    required_token: Mutex<Option<String>>,
    /// When true, series detail requests fail with a 500.
    fail_series_detail: AtomicBool,
    updated_ids: Mutex<Vec<i32>>,
    last_from_time: Mutex<Option<i64>>,
}

impl StubState {
    fn hit(&self, key: &'static str) {
        *self.hits.lock().unwrap().entry(key).or_insert(0) += 1;
    }

    fn hits(&self, key: &'static str) -> usize {
        self.hits.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(required) = self.required_token.lock().unwrap().clone() else {
            return true;
        };
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {required}"))
    }
}

fn envelope(data: Value) -> Response {
    Json(json!({ "data": data })).into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "errors": ["Resource not found"] })),
    )
        .into_response()
}

fn series_payload(id: i32) -> Value {
    json!({
        "id": id,
        "seriesName": "The X-Files",
        "status": "Ended",
        "siteRating": "9.1",
        "runtime": "45",
        "airsTime": "8:00 PM",
        "airsDayOfWeek": "Monday",
        "rating": "TV-14",
        "network": "FOX",
        "overview": "Two FBI agents investigate the unexplained.",
        "imdbId": "tt0106179",
        "zap2itId": "EP00080955",
        "banner": "graphical/77398-g.jpg",
        "firstAired": "1993-09-10",
        "aliases": ["The XFiles"],
        "genre": ["Science Fiction", "Drama"],
        "lastUpdated": 1462425405
    })
}

async fn login(State(state): State<Arc<StubState>>) -> Response {
    state.hit("login");
    let count = state.login_count.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "token": format!("token-{count}") })).into_response()
}

async fn series_detail(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    state.hit("series");
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if state.fail_series_detail.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    envelope(series_payload(id))
}

async fn series_actors(State(state): State<Arc<StubState>>) -> Response {
    state.hit("actors");
    envelope(json!([
        { "name": "Gillian Anderson" },
        { "name": "David Duchovny" }
    ]))
}

async fn series_images(State(state): State<Arc<StubState>>) -> Response {
    state.hit("posters");
    // Six posters so the top-5 cap is observable.
    let posters: Vec<Value> = (1..=6)
        .map(|n| json!({ "fileName": format!("posters/77398-{n}.jpg") }))
        .collect();
    envelope(json!(posters))
}

async fn search_series(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.hit("search");
    let name = params.get("name").map(String::as_str).unwrap_or_default();
    if name.to_lowercase().contains("x-files") {
        return envelope(json!([
            { "id": XFILES_ID, "seriesName": "The X-Files", "firstAired": "1993-09-10" }
        ]));
    }
    not_found()
}

async fn episode_detail(
    State(state): State<Arc<StubState>>,
    Path(id): Path<i32>,
) -> Response {
    state.hit("episode_detail");
    if id != PILOT_EPISODE_ID {
        return not_found();
    }
    envelope(json!({
        "id": id,
        "episodeName": "Pilot",
        "airedSeason": 1,
        "airedEpisodeNumber": 1,
        "absoluteNumber": 1,
        "overview": "Scully is assigned to the X-Files.",
        "siteRating": 8.2,
        "director": "Robert Mandel",
        "filename": "episodes/77398/177831.jpg",
        "firstAired": "1993-09-10",
        "lastUpdated": 1446093112
    }))
}

async fn episode_query(
    State(state): State<Arc<StubState>>,
    Path(id): Path<i32>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.hit("episode_query");
    let matches_pilot = id == XFILES_ID
        && (params.get("absoluteNumber").map(String::as_str) == Some("1")
            || (params.get("airedSeason").map(String::as_str) == Some("1")
                && params.get("airedEpisode").map(String::as_str) == Some("1")));
    if matches_pilot {
        envelope(json!([{ "id": PILOT_EPISODE_ID }]))
    } else {
        not_found()
    }
}

async fn updated_query(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.hit("updated");
    *state.last_from_time.lock().unwrap() =
        params.get("fromTime").and_then(|t| t.parse().ok());
    let ids: Vec<Value> = state
        .updated_ids
        .lock()
        .unwrap()
        .iter()
        .map(|id| json!({ "id": id }))
        .collect();
    envelope(json!(ids))
}

async fn spawn_stub(state: Arc<StubState>) -> String {
    let app = Router::new()
        .route("/login", post(login))
        .route("/series/{id}", get(series_detail))
        .route("/series/{id}/actors", get(series_actors))
        .route("/series/{id}/images/query", get(series_images))
        .route("/search/series", get(search_series))
        .route("/episodes/{id}", get(episode_detail))
        .route("/series/{id}/episodes/query", get(episode_query))
        .route("/updated/query", get(updated_query))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind stub listener");
    let addr = listener.local_addr().expect("missing stub address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server died");
    });

    format!("http://{addr}/")
}

async fn test_env(base_url: &str) -> (Store, LookupService) {
    let db_path = std::env::temp_dir().join(format!("metarr-test-{}.db", uuid::Uuid::new_v4()));
    let store = Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("failed to create store");

    let tvdb = Arc::new(TvdbClient::new(
        TvdbConfig {
            base_url: base_url.to_string(),
            api_key: "TESTKEY".to_string(),
            ..TvdbConfig::default()
        },
        store.clone(),
    ));

    (store.clone(), LookupService::new(store, tvdb))
}

#[tokio::test]
async fn resolve_by_id_is_idempotent_and_serves_repeats_from_cache() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (store, lookup) = test_env(&base).await;

    let first = lookup
        .resolve_series(None, Some(XFILES_ID), false)
        .await
        .unwrap();
    assert!(!first.degraded);
    assert!(!first.record.expired);
    let first_view = lookup.series_view(&first.record, false).await.unwrap();

    let second = lookup
        .resolve_series(None, Some(XFILES_ID), false)
        .await
        .unwrap();
    let second_view = lookup.series_view(&second.record, false).await.unwrap();

    assert_eq!(
        serde_json::to_string(&first_view).unwrap(),
        serde_json::to_string(&second_view).unwrap()
    );

    // One detail fetch; the second resolve is a pure cache hit. The lazy
    // actor/poster fields are fetched once and cached on the series row.
    assert_eq!(state.hits("series"), 1);
    assert_eq!(state.hits("actors"), 1);
    assert_eq!(state.hits("posters"), 1);
    // The first reconciliation pass only records a baseline timestamp.
    assert_eq!(state.hits("updated"), 0);

    assert_eq!(first_view.rating, 9.1);
    assert_eq!(first_view.runtime, 45);
    assert_eq!(first_view.genres, vec!["Drama", "Science Fiction"]);
    assert_eq!(
        first_view.actors,
        vec!["Gillian Anderson", "David Duchovny"]
    );
    assert_eq!(first_view.posters.len(), 5);
    assert!(
        first_view.posters[0].starts_with("https://thetvdb.com/banners/posters/"),
        "poster urls should carry the banner base: {}",
        first_view.posters[0]
    );

    // The series name and every alias are memoized as search strings.
    let own = store.find_search_result("the x-files").await.unwrap();
    assert_eq!(own.and_then(|r| r.series_id), Some(XFILES_ID));
    let alias = store.find_search_result("The XFiles").await.unwrap();
    assert_eq!(alias.and_then(|r| r.series_id), Some(XFILES_ID));
}

#[tokio::test]
async fn name_lookup_memoizes_the_search() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (_store, lookup) = test_env(&base).await;

    let first = lookup
        .resolve_series(Some("X-Files"), None, false)
        .await
        .unwrap();
    assert_eq!(first.record.id, XFILES_ID);

    let second = lookup
        .resolve_series(Some("X-Files"), None, false)
        .await
        .unwrap();
    assert_eq!(second.record.id, XFILES_ID);

    assert_eq!(state.hits("search"), 1);
    assert_eq!(state.hits("series"), 1);
}

#[tokio::test]
async fn cache_only_miss_fails_without_any_remote_call() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (_store, lookup) = test_env(&base).await;

    let err = lookup
        .resolve_series(Some("Unknown Show"), None, true)
        .await
        .unwrap_err();

    assert!(matches!(err, LookupError::NotFound(_)), "got {err:?}");
    assert_eq!(state.total_hits(), 0);
}

#[tokio::test]
async fn missing_criteria_is_an_invalid_argument() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (_store, lookup) = test_env(&base).await;

    let err = lookup.resolve_series(None, None, false).await.unwrap_err();
    assert!(matches!(err, LookupError::InvalidArgument(_)));
    assert_eq!(state.total_hits(), 0);
}

#[tokio::test]
async fn expired_series_falls_back_to_cached_data_when_refresh_fails() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (store, lookup) = test_env(&base).await;

    lookup
        .resolve_series(None, Some(XFILES_ID), false)
        .await
        .unwrap();

    store.mark_series_expired(&[XFILES_ID]).await.unwrap();
    state.fail_series_detail.store(true, Ordering::SeqCst);

    let resolved = lookup
        .resolve_series(None, Some(XFILES_ID), false)
        .await
        .unwrap();

    assert!(resolved.degraded);
    assert_eq!(resolved.record.name, "The X-Files");
    assert!(resolved.record.expired, "record stays expired after a failed refresh");
}

#[tokio::test]
async fn expired_series_is_refreshed_and_cleared() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (store, lookup) = test_env(&base).await;

    lookup
        .resolve_series(None, Some(XFILES_ID), false)
        .await
        .unwrap();
    store.mark_series_expired(&[XFILES_ID]).await.unwrap();

    let resolved = lookup
        .resolve_series(None, Some(XFILES_ID), false)
        .await
        .unwrap();

    assert!(!resolved.degraded);
    assert!(!resolved.record.expired);
    assert_eq!(state.hits("series"), 2);
}

#[tokio::test]
async fn reconciler_is_gated_to_the_two_hour_window() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (store, lookup) = test_env(&base).await;

    lookup
        .resolve_series(None, Some(XFILES_ID), false)
        .await
        .unwrap();
    state.updated_ids.lock().unwrap().push(XFILES_ID);

    // First call recorded the baseline; calls inside the window are no-ops.
    lookup.reconciler().mark_expired().await.unwrap();
    lookup.reconciler().mark_expired().await.unwrap();
    assert_eq!(state.hits("updated"), 0);

    // Age the last check past the window; the next call queries with the
    // 60 second safety buffer applied.
    let stale_check = Utc::now() - Duration::hours(3);
    store
        .set_bookkeeping("last_check", &stale_check.to_rfc3339())
        .await
        .unwrap();

    lookup.reconciler().mark_expired().await.unwrap();
    assert_eq!(state.hits("updated"), 1);
    assert_eq!(
        *state.last_from_time.lock().unwrap(),
        Some(stale_check.timestamp() - 60)
    );

    let series = store.get_series(XFILES_ID).await.unwrap().unwrap();
    assert!(series.expired);

    // The timestamp advanced, so an immediate follow-up is a no-op again.
    lookup.reconciler().mark_expired().await.unwrap();
    assert_eq!(state.hits("updated"), 1);
}

#[tokio::test]
async fn unauthorized_response_triggers_exactly_one_token_refresh() {
    let state = Arc::new(StubState::default());
    *state.required_token.lock().unwrap() = Some("token-2".to_string());
    let base = spawn_stub(state.clone()).await;
    let (store, lookup) = test_env(&base).await;

    // First login yields token-1 which the stub rejects, forcing a single
    // refresh to token-2 and a retry of the same request.
    let resolved = lookup
        .resolve_series(None, Some(XFILES_ID), false)
        .await
        .unwrap();

    assert_eq!(resolved.record.name, "The X-Files");
    assert_eq!(state.hits("login"), 2);
    assert_eq!(state.hits("series"), 2);

    // The refreshed token is persisted: a brand-new client on the same
    // store does not log in again.
    let tvdb = Arc::new(TvdbClient::new(
        TvdbConfig {
            base_url: base.clone(),
            api_key: "TESTKEY".to_string(),
            ..TvdbConfig::default()
        },
        store.clone(),
    ));
    let second_lookup = LookupService::new(store.clone(), tvdb);
    store.mark_series_expired(&[XFILES_ID]).await.unwrap();
    second_lookup
        .resolve_series(None, Some(XFILES_ID), false)
        .await
        .unwrap();
    assert_eq!(state.hits("login"), 2);
}

#[tokio::test]
async fn episode_lookup_fetches_once_then_serves_from_cache() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (_store, lookup) = test_env(&base).await;

    let filter = EpisodeFilter {
        season_number: Some(1),
        episode_number: Some(1),
        ..EpisodeFilter::default()
    };

    let first = lookup
        .resolve_episode(None, Some(XFILES_ID), filter, false)
        .await
        .unwrap();
    assert_eq!(first.record.id, PILOT_EPISODE_ID);
    assert_eq!(first.record.series_id, XFILES_ID);
    assert_eq!(first.record.name.as_deref(), Some("Pilot"));
    assert!(!first.record.expired);

    let second = lookup
        .resolve_episode(None, Some(XFILES_ID), filter, false)
        .await
        .unwrap();
    assert_eq!(second.record.id, PILOT_EPISODE_ID);

    assert_eq!(state.hits("episode_query"), 1);
    assert_eq!(state.hits("episode_detail"), 1);

    let view = lookup.episode_view(&second.record);
    assert_eq!(
        view.image.as_deref(),
        Some("https://thetvdb.com/banners/episodes/77398/177831.jpg")
    );
}

#[tokio::test]
async fn episode_lookup_by_absolute_number() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (_store, lookup) = test_env(&base).await;

    let filter = EpisodeFilter {
        absolute_number: Some(1),
        ..EpisodeFilter::default()
    };

    let resolved = lookup
        .resolve_episode(None, Some(XFILES_ID), filter, false)
        .await
        .unwrap();
    assert_eq!(resolved.record.id, PILOT_EPISODE_ID);
}

#[tokio::test]
async fn episode_lookup_without_number_filters_is_rejected() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (_store, lookup) = test_env(&base).await;

    let err = lookup
        .resolve_episode(None, Some(XFILES_ID), EpisodeFilter::default(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, LookupError::InvalidArgument(_)), "got {err:?}");
}

#[tokio::test]
async fn episode_cache_only_miss_fails() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (_store, lookup) = test_env(&base).await;

    lookup
        .resolve_series(None, Some(XFILES_ID), false)
        .await
        .unwrap();
    let before = state.total_hits();

    let filter = EpisodeFilter {
        season_number: Some(9),
        episode_number: Some(9),
        ..EpisodeFilter::default()
    };
    let err = lookup
        .resolve_episode(None, Some(XFILES_ID), filter, true)
        .await
        .unwrap_err();

    assert!(matches!(err, LookupError::NotFound(_)));
    assert_eq!(state.total_hits(), before);
}

#[tokio::test]
async fn unmatched_episode_query_is_not_found() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (_store, lookup) = test_env(&base).await;

    let filter = EpisodeFilter {
        season_number: Some(4),
        episode_number: Some(4),
        ..EpisodeFilter::default()
    };
    let err = lookup
        .resolve_episode(None, Some(XFILES_ID), filter, false)
        .await
        .unwrap_err();

    assert!(matches!(err, LookupError::NotFound(_)), "got {err:?}");
}
