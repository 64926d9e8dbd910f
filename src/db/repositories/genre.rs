use crate::entities::{genre, prelude::*, series_genres};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};

pub struct GenreRepository {
    conn: DatabaseConnection,
}

impl GenreRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Looks a genre up case-insensitively, creating it when absent.
    pub async fn find_or_create(&self, name: &str) -> Result<genre::Model, DbErr> {
        let existing = Genre::find()
            .filter(Expr::expr(Func::lower(Expr::col(genre::Column::Name))).eq(name.to_lowercase()))
            .one(&self.conn)
            .await?;

        if let Some(genre) = existing {
            return Ok(genre);
        }

        let active = genre::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        };
        let inserted = Genre::insert(active).exec(&self.conn).await?;

        Ok(genre::Model {
            id: inserted.last_insert_id,
            name: name.to_string(),
        })
    }

    /// Replaces the genre association set of a series.
    pub async fn set_for_series(&self, series_id: i32, names: &[String]) -> Result<(), DbErr> {
        SeriesGenres::delete_many()
            .filter(series_genres::Column::SeriesId.eq(series_id))
            .exec(&self.conn)
            .await?;

        let mut seen = std::collections::HashSet::new();
        for name in names {
            if !seen.insert(name.to_lowercase()) {
                continue;
            }
            let genre = self.find_or_create(name).await?;
            SeriesGenres::insert(series_genres::ActiveModel {
                series_id: Set(series_id),
                genre_id: Set(genre.id),
            })
            .exec(&self.conn)
            .await?;
        }

        Ok(())
    }

    /// Genre names of a series, sorted for stable output.
    pub async fn names_for_series(&self, series_id: i32) -> Result<Vec<String>, DbErr> {
        let links = SeriesGenres::find()
            .filter(series_genres::Column::SeriesId.eq(series_id))
            .all(&self.conn)
            .await?;

        let ids: Vec<i32> = links.iter().map(|l| l.genre_id).collect();
        let genres = Genre::find()
            .filter(genre::Column::Id.is_in(ids))
            .order_by_asc(genre::Column::Name)
            .all(&self.conn)
            .await?;

        Ok(genres.into_iter().map(|g| g.name).collect())
    }
}
