use crate::entities::{bookkeeping, prelude::*};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set};

pub struct BookkeepingRepository {
    conn: DatabaseConnection,
}

impl BookkeepingRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, DbErr> {
        let row = Bookkeeping::find_by_id(key.to_string()).one(&self.conn).await?;
        Ok(row.map(|r| r.value))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), DbErr> {
        let active = bookkeeping::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
        };

        Bookkeeping::insert(active)
            .on_conflict(
                OnConflict::column(bookkeeping::Column::Key)
                    .update_column(bookkeeping::Column::Value)
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }
}
