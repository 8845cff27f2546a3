pub mod api;
pub mod auth;
pub mod billing;
pub mod bootstrap;
pub mod error;
pub mod internships;
pub mod resumes;
pub mod router;
pub mod server;
pub mod state;

pub use server::GatewayServer;
