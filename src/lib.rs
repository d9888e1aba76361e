pub mod client;
pub mod config;
pub mod exchange;
pub mod models;
pub mod renderer;
pub mod session;
pub mod speech;
pub mod ui;

pub use client::{ChatBackend, OllamaClient};
pub use config::ServerConfig;
pub use models::{ModelDescriptor, Role, StreamChunk, Turn};
pub use session::ChatSession;
