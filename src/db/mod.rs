use crate::entities::{episode, search_result, series};
use crate::models::episode::EpisodeFilter;
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

/// Facade over the SQLite cache. Cheap to clone; all repositories share
/// the underlying connection pool.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn series_repo(&self) -> repositories::series::SeriesRepository {
        repositories::series::SeriesRepository::new(self.conn.clone())
    }

    fn episode_repo(&self) -> repositories::episode::EpisodeRepository {
        repositories::episode::EpisodeRepository::new(self.conn.clone())
    }

    fn genre_repo(&self) -> repositories::genre::GenreRepository {
        repositories::genre::GenreRepository::new(self.conn.clone())
    }

    fn search_repo(&self) -> repositories::search::SearchRepository {
        repositories::search::SearchRepository::new(self.conn.clone())
    }

    fn bookkeeping_repo(&self) -> repositories::bookkeeping::BookkeepingRepository {
        repositories::bookkeeping::BookkeepingRepository::new(self.conn.clone())
    }

    pub async fn get_series(&self, id: i32) -> Result<Option<series::Model>, DbErr> {
        self.series_repo().get(id).await
    }

    pub async fn upsert_series(&self, model: series::Model) -> Result<(), DbErr> {
        self.series_repo().upsert(model).await
    }

    pub async fn set_series_actors(&self, id: i32, actors_json: &str) -> Result<(), DbErr> {
        self.series_repo().set_actors(id, actors_json).await
    }

    pub async fn set_series_posters(&self, id: i32, posters_json: &str) -> Result<(), DbErr> {
        self.series_repo().set_posters(id, posters_json).await
    }

    pub async fn mark_series_expired(&self, ids: &[i32]) -> Result<u64, DbErr> {
        self.series_repo().mark_expired(ids).await
    }

    pub async fn remove_series(&self, id: i32) -> Result<bool, DbErr> {
        self.series_repo().remove(id).await
    }

    pub async fn get_episode(&self, id: i32) -> Result<Option<episode::Model>, DbErr> {
        self.episode_repo().get(id).await
    }

    pub async fn find_episode(
        &self,
        series_id: i32,
        filter: &EpisodeFilter,
    ) -> Result<Option<episode::Model>, DbErr> {
        self.episode_repo().find_for_series(series_id, filter).await
    }

    pub async fn upsert_episode(&self, model: episode::Model) -> Result<(), DbErr> {
        self.episode_repo().upsert(model).await
    }

    pub async fn mark_episodes_expired(&self, series_ids: &[i32]) -> Result<u64, DbErr> {
        self.episode_repo().mark_expired_by_series(series_ids).await
    }

    pub async fn set_series_genres(&self, series_id: i32, names: &[String]) -> Result<(), DbErr> {
        self.genre_repo().set_for_series(series_id, names).await
    }

    pub async fn genres_for_series(&self, series_id: i32) -> Result<Vec<String>, DbErr> {
        self.genre_repo().names_for_series(series_id).await
    }

    pub async fn find_search_result(
        &self,
        search: &str,
    ) -> Result<Option<search_result::Model>, DbErr> {
        self.search_repo().find(search).await
    }

    pub async fn upsert_search_result(
        &self,
        search: &str,
        series_id: Option<i32>,
    ) -> Result<(), DbErr> {
        self.search_repo().upsert(search, series_id).await
    }

    pub async fn get_bookkeeping(&self, key: &str) -> Result<Option<String>, DbErr> {
        self.bookkeeping_repo().get(key).await
    }

    pub async fn set_bookkeeping(&self, key: &str, value: &str) -> Result<(), DbErr> {
        self.bookkeeping_repo().set(key, value).await
    }
}
