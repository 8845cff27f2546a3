pub mod coach_store;
pub mod repository;

pub use coach_store::CoachStore;
pub use repository::{CoachRepository, SqliteCoachRepository};
