//! Multi-turn career coach: bounded context, rolling summaries and
//! per-session turn serialization.

pub mod context;
pub mod locks;
pub mod service;
pub mod summary;

pub use context::{DEFAULT_HISTORY_LIMIT, SUMMARY_PREFIX, build_context};
pub use locks::KeyedLocks;
pub use service::{CoachService, CoachSettings, SessionDetail, TurnOutcome};
pub use summary::{
    DEFAULT_SUMMARY_INTERVAL, SUMMARY_INSTRUCTION, SUMMARY_REQUEST, should_summarize,
    summary_prompt,
};
