use async_trait::async_trait;
use thiserror::Error;

use crate::transcript::Turn;

/// A reply from the generation service: the text to show the user, plus any
/// URLs the server-side URL-context tool retrieved while producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub source_urls: Vec<String>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_urls: Vec::new(),
        }
    }
}

/// Error classification for generation requests.
///
/// Transient errors (timeout, connect failure, 408/429/5xx) are safe for the
/// user to retry on the next turn; permanent errors (auth rejection, bad
/// request) will not go away by retyping the message.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transient provider error (try again): {0}")]
    Transient(String),
    #[error("provider error: {0}")]
    Permanent(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Opaque generation capability behind which the external service lives.
///
/// The system instruction and tool configuration are fixed when an
/// implementation is constructed, so every call within a session is made
/// with identical configuration. Implementations receive the full ordered
/// transcript on every call.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, turns: &[Turn]) -> Result<Reply, ProviderError>;
}
