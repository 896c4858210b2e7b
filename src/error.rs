use std::time::Duration;

use thiserror::Error;

/// Malformed or missing request fields. Surfaced to callers as a 400.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("No image provided.")]
    MissingImage,

    #[error("Image payload is not valid base64: {0}")]
    InvalidImage(#[from] base64::DecodeError),

    #[error("No text provided to translate.")]
    MissingText,
}

/// Failure of the external detection process.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("failed to stage image for detection: {0}")]
    Stage(#[source] std::io::Error),

    #[error("failed to spawn detection process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to read detection process output: {0}")]
    Io(#[source] std::io::Error),

    #[error("detection process error: {0}")]
    Stderr(String),

    #[error("detection process exited with code {}", exit_code(.0))]
    Exit(Option<i32>),

    #[error("detection process timed out after {0:?}")]
    Timeout(Duration),
}

fn exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// Failure of a generative model call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("API key not set for the model")]
    MissingApiKey,
}

/// Everything that can go wrong while serving a challenge.
#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingApiKey(&'static str),
}
