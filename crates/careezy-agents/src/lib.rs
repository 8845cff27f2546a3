pub mod coach;
pub mod providers;
pub mod resume;

pub use coach::{CoachService, CoachSettings, KeyedLocks, SessionDetail, TurnOutcome};
pub use providers::{
    AnthropicProvider, ChatMessage, ChatRole, LlmProvider, LlmRequest, LlmResponse, OpenAiProvider,
    Usage,
};
pub use resume::ResumeAdvisor;
