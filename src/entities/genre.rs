use sea_orm::entity::prelude::*;

/// Genres are shared across series and unique case-insensitively by name;
/// the case-insensitive lookup lives in the genre repository.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "genres")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl Related<super::series::Entity> for Entity {
    fn to() -> RelationDef {
        super::series_genres::Relation::Series.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::series_genres::Relation::Genre.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
