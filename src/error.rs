use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort a run. No variant is raised after the first
/// artifact has been renamed into place.
#[derive(Debug, Error)]
pub enum TickerError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("rate limited by provider: {0}")]
    RateLimit(String),

    #[error("provider returned no usable listings")]
    EmptyResult,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("another run holds the lock at {}", .0.display())]
    Locked(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl TickerError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Auth(_) => 2,
            Self::RateLimit(_) => 3,
            Self::TransientNetwork(_) => 4,
            Self::EmptyResult => 5,
            Self::Locked(_) => 6,
            Self::Provider(_)
            | Self::MalformedResponse(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Csv(_) => 1,
        }
    }
}

pub type Result<T, E = TickerError> = std::result::Result<T, E>;
