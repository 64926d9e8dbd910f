use crate::entities::{prelude::*, search_result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

pub struct SearchRepository {
    conn: DatabaseConnection,
}

impl SearchRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Search strings are stored lowercase; callers may pass any casing.
    pub async fn find(&self, search: &str) -> Result<Option<search_result::Model>, DbErr> {
        SearchResult::find()
            .filter(search_result::Column::Search.eq(search.to_lowercase()))
            .one(&self.conn)
            .await
    }

    pub async fn upsert(&self, search: &str, series_id: Option<i32>) -> Result<(), DbErr> {
        let active = search_result::ActiveModel {
            search: Set(search.to_lowercase()),
            series_id: Set(series_id),
            ..Default::default()
        };

        SearchResult::insert(active)
            .on_conflict(
                OnConflict::column(search_result::Column::Search)
                    .update_column(search_result::Column::SeriesId)
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }
}
