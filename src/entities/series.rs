use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "series")]
pub struct Model {
    /// TVDB-assigned id, never generated locally.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    /// Remote lastUpdated timestamp (epoch seconds), used for staleness.
    pub last_updated: i64,
    pub expired: bool,
    pub name: String,
    pub language: Option<String>,
    pub rating: f64,
    pub status: Option<String>,
    pub runtime: i32,
    pub airs_time: Option<String>,
    pub airs_dayofweek: Option<String>,
    pub content_rating: Option<String>,
    pub network: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub overview: Option<String>,
    pub imdb_id: Option<String>,
    pub zap2it_id: Option<String>,
    /// Banner file name; the full URL is built by prefixing the banner base.
    pub banner: Option<String>,
    pub first_aired: Option<String>,
    pub aliases: Option<String>, // JSON array stored as string
    pub actors: Option<String>,  // JSON array stored as string, NULL until first fetch
    pub posters: Option<String>, // JSON array stored as string, NULL until first fetch
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::episode::Entity")]
    Episode,
    #[sea_orm(has_many = "super::search_result::Entity")]
    SearchResult,
}

impl Related<super::episode::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Episode.def()
    }
}

impl Related<super::search_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SearchResult.def()
    }
}

impl Related<super::genre::Entity> for Entity {
    fn to() -> RelationDef {
        super::series_genres::Relation::Genre.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::series_genres::Relation::Series.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
