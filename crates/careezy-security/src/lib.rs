pub mod auth;
pub mod redaction;

pub use auth::{AuthenticatedUser, SupabaseTokenVerifier, TokenVerifier, bearer_token};
pub use redaction::{RedactingWriter, redact_secrets};
