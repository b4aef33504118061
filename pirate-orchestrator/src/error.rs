use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("no scraper named '{0}' is registered")]
    ScraperNotFound(String),

    #[error("scraper '{name}' exceeded its {timeout:?} timeout")]
    Timeout { name: String, timeout: Duration },

    #[error("scraper '{name}' exited with code {code:?}")]
    NonZeroExit { name: String, code: Option<i32> },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
