use async_trait::async_trait;

use crate::error::GenerationError;

/// Trait for generative text models that turn a prompt into a completion.
///
/// The challenge generator and the translator both talk to the model through
/// this trait, so a remote API can be swapped for a canned implementation in
/// tests without touching the pipeline.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Runs the model on the given prompt and returns the raw completion text.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[async_trait]
impl<M: TextModel + ?Sized> TextModel for std::sync::Arc<M> {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt).await
    }
}
