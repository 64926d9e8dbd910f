use sea_orm::entity::prelude::*;

/// Memoizes a lowercase search string to a series id. The series id is
/// nullable so a search can be recorded before it resolves.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "search_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Always stored lowercase.
    #[sea_orm(unique)]
    pub search: String,
    pub series_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::series::Entity",
        from = "Column::SeriesId",
        to = "super::series::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Series,
}

impl Related<super::series::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Series.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
