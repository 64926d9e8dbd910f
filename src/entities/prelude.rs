pub use super::bookkeeping::Entity as Bookkeeping;
pub use super::episode::Entity as Episode;
pub use super::genre::Entity as Genre;
pub use super::search_result::Entity as SearchResult;
pub use super::series::Entity as Series;
pub use super::series_genres::Entity as SeriesGenres;
