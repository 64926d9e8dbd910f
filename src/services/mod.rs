pub mod lookup;
pub mod reconcile;

pub use lookup::{LookupService, Resolved};
pub use reconcile::ExpiryReconciler;
