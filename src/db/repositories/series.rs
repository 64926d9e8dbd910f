use crate::entities::{prelude::*, series};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

pub struct SeriesRepository {
    conn: DatabaseConnection,
}

impl SeriesRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<series::Model>, DbErr> {
        Series::find_by_id(id).one(&self.conn).await
    }

    /// Inserts or fully overwrites a series row. The id comes from the
    /// remote catalog, so re-fetching the same series is idempotent.
    pub async fn upsert(&self, model: series::Model) -> Result<(), DbErr> {
        let active = series::ActiveModel {
            id: Set(model.id),
            last_updated: Set(model.last_updated),
            expired: Set(model.expired),
            name: Set(model.name),
            language: Set(model.language),
            rating: Set(model.rating),
            status: Set(model.status),
            runtime: Set(model.runtime),
            airs_time: Set(model.airs_time),
            airs_dayofweek: Set(model.airs_dayofweek),
            content_rating: Set(model.content_rating),
            network: Set(model.network),
            overview: Set(model.overview),
            imdb_id: Set(model.imdb_id),
            zap2it_id: Set(model.zap2it_id),
            banner: Set(model.banner),
            first_aired: Set(model.first_aired),
            aliases: Set(model.aliases),
            actors: Set(model.actors),
            posters: Set(model.posters),
        };

        Series::insert(active)
            .on_conflict(
                OnConflict::column(series::Column::Id)
                    .update_columns([
                        series::Column::LastUpdated,
                        series::Column::Expired,
                        series::Column::Name,
                        series::Column::Language,
                        series::Column::Rating,
                        series::Column::Status,
                        series::Column::Runtime,
                        series::Column::AirsTime,
                        series::Column::AirsDayofweek,
                        series::Column::ContentRating,
                        series::Column::Network,
                        series::Column::Overview,
                        series::Column::ImdbId,
                        series::Column::Zap2itId,
                        series::Column::Banner,
                        series::Column::FirstAired,
                        series::Column::Aliases,
                        series::Column::Actors,
                        series::Column::Posters,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn set_actors(&self, id: i32, actors_json: &str) -> Result<(), DbErr> {
        Series::update_many()
            .col_expr(series::Column::Actors, Expr::value(actors_json))
            .filter(series::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn set_posters(&self, id: i32, posters_json: &str) -> Result<(), DbErr> {
        Series::update_many()
            .col_expr(series::Column::Posters, Expr::value(posters_json))
            .filter(series::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn mark_expired(&self, ids: &[i32]) -> Result<u64, DbErr> {
        let result = Series::update_many()
            .col_expr(series::Column::Expired, Expr::value(true))
            .filter(series::Column::Id.is_in(ids.iter().copied()))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    /// Deletes a series; episodes, genre links and search mappings go with
    /// it via the schema's cascade/set-null rules.
    pub async fn remove(&self, id: i32) -> Result<bool, DbErr> {
        let result = Series::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
