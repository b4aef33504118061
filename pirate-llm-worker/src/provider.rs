//! The LLM provider contract: `generate(prompt, schema) -> text|parsed`,
//! the only interface the worker depends on. Concrete providers (OpenAI,
//! Claude, ...) live outside this crate; only the trait and the typed
//! error taxonomy it must classify itself against are specified here.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A provider's structured-output request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub schema: Value,
    pub strict: bool,
    pub max_tokens: u32,
    /// Capped by the worker at 0.4 before ever reaching a provider, per
    /// the alignment contract.
    pub temperature: f32,
}

/// What a successful call returns: raw text and, when the provider
/// supports strict structured output, the already-parsed object.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub text: String,
    pub parsed: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub authenticated: bool,
    pub model: String,
}

/// The five failure kinds a provider call can terminate with. Mirrors
/// `pirate_core::ErrorKind`'s provider-facing variants one-for-one; kept
/// as its own enum here so this crate's public API doesn't force every
/// caller to depend on the full core error taxonomy just to match on a
/// provider failure.
#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("quota exceeded")]
    QuotaExceeded,
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("transient error: {0}")]
    Transient(String),
    #[error("permanent error: {0}")]
    Permanent(String),
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError>;
    async fn healthcheck(&self) -> Result<HealthStatus, ProviderError>;
    fn name(&self) -> &str;
}
