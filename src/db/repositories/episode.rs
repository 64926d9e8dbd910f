use crate::entities::{episode, prelude::*};
use crate::models::episode::EpisodeFilter;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

pub struct EpisodeRepository {
    conn: DatabaseConnection,
}

impl EpisodeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<episode::Model>, DbErr> {
        Episode::find_by_id(id).one(&self.conn).await
    }

    /// Finds an episode of a series by whichever number filters are set.
    pub async fn find_for_series(
        &self,
        series_id: i32,
        filter: &EpisodeFilter,
    ) -> Result<Option<episode::Model>, DbErr> {
        let mut query = Episode::find().filter(episode::Column::SeriesId.eq(series_id));

        if let Some(absolute) = filter.absolute_number {
            query = query.filter(episode::Column::AbsoluteNumber.eq(absolute));
        }
        if let Some(season) = filter.season_number {
            query = query.filter(episode::Column::SeasonNumber.eq(season));
        }
        if let Some(episode_number) = filter.episode_number {
            query = query.filter(episode::Column::EpisodeNumber.eq(episode_number));
        }

        query.one(&self.conn).await
    }

    pub async fn upsert(&self, model: episode::Model) -> Result<(), DbErr> {
        let active = episode::ActiveModel {
            id: Set(model.id),
            series_id: Set(model.series_id),
            expired: Set(model.expired),
            last_updated: Set(model.last_updated),
            season_number: Set(model.season_number),
            episode_number: Set(model.episode_number),
            absolute_number: Set(model.absolute_number),
            name: Set(model.name),
            overview: Set(model.overview),
            rating: Set(model.rating),
            director: Set(model.director),
            image: Set(model.image),
            first_aired: Set(model.first_aired),
        };

        Episode::insert(active)
            .on_conflict(
                OnConflict::column(episode::Column::Id)
                    .update_columns([
                        episode::Column::SeriesId,
                        episode::Column::Expired,
                        episode::Column::LastUpdated,
                        episode::Column::SeasonNumber,
                        episode::Column::EpisodeNumber,
                        episode::Column::AbsoluteNumber,
                        episode::Column::Name,
                        episode::Column::Overview,
                        episode::Column::Rating,
                        episode::Column::Director,
                        episode::Column::Image,
                        episode::Column::FirstAired,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    /// Marks all episodes belonging to the given series ids as expired.
    pub async fn mark_expired_by_series(&self, series_ids: &[i32]) -> Result<u64, DbErr> {
        let result = Episode::update_many()
            .col_expr(episode::Column::Expired, Expr::value(true))
            .filter(episode::Column::SeriesId.is_in(series_ids.iter().copied()))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
