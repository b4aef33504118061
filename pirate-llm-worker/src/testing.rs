//! A deterministic [`LlmProvider`] double for exercising [`crate::worker`]
//! without a real vendor client, in the same spirit as
//! `pirate_queue::MemoryBackend` standing in for `RedisBackend`.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::provider::{GenerateRequest, GenerateResponse, HealthStatus, LlmProvider, ProviderError};

/// One scripted outcome for a single `generate` call.
pub enum Scripted {
    Ok(GenerateResponse),
    Err(ProviderError),
}

/// Plays back `responses` in order, one per `generate` call. Panics if a
/// test drives more calls than it scripted — a louder failure than silently
/// repeating the last response.
pub struct StubProvider {
    responses: Mutex<std::collections::VecDeque<Scripted>>,
    calls: Mutex<u32>,
}

impl StubProvider {
    pub fn new(responses: Vec<Scripted>) -> Self {
        Self { responses: Mutex::new(responses.into_iter().collect()), calls: Mutex::new(0) }
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock()
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        *self.calls.lock() += 1;
        match self.responses.lock().pop_front() {
            Some(Scripted::Ok(response)) => Ok(response),
            Some(Scripted::Err(error)) => Err(error),
            None => panic!("StubProvider: no more scripted responses"),
        }
    }

    async fn healthcheck(&self) -> Result<HealthStatus, ProviderError> {
        Ok(HealthStatus { authenticated: true, model: "stub".to_string() })
    }

    fn name(&self) -> &str {
        "stub"
    }
}
