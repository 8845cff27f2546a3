pub mod coach;
pub mod error;
pub mod types;

pub use coach::{CoachMessage, CoachSession, MessageRole};
pub use error::{Error, Result};
pub use types::{SessionId, UserId};
