pub mod config;
pub mod error;
pub mod gemini;
pub mod provider;
pub mod session;
pub mod transcript;

pub use config::AppConfig;
pub use error::ChatError;
pub use gemini::GeminiClient;
pub use provider::{Generator, ProviderError, Reply};
pub use session::ChatSession;
pub use transcript::{Role, Transcript, Turn};
