//! Service layer: persistence, collaborator seams and metrics.

pub mod database;
pub mod metrics;
pub mod store;

pub use database::Database;
pub use store::{DictionarySource, MovementStore, PncSource};
