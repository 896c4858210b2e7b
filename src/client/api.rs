use async_trait::async_trait;
use thiserror::Error;

use crate::messages::{ChallengeRequest, ChallengeResponse, TranslateRequest, TranslateResponse};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server error: {0}")]
    Status(reqwest::StatusCode),
}

/// The two calls the capture client makes against the server.
#[async_trait]
pub trait ChallengeApi: Send + Sync {
    /// Sends a captured frame (base64, optionally a data URI) and returns the challenge text.
    async fn challenge(&self, image: String) -> Result<String, ApiError>;

    /// Returns the English rendering of `text`.
    async fn translate(&self, text: String) -> Result<String, ApiError>;
}

/// [`ChallengeApi`] over HTTP.
pub struct HttpChallengeApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChallengeApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<Req: serde::Serialize + Sync, Res: serde::de::DeserializeOwned + Send>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Res, ApiError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        Ok(response.json::<Res>().await?)
    }
}

#[async_trait]
impl ChallengeApi for HttpChallengeApi {
    async fn challenge(&self, image: String) -> Result<String, ApiError> {
        let request = ChallengeRequest { image: Some(image) };
        let response: ChallengeResponse = self.post("/challenge", &request).await?;
        Ok(response.text)
    }

    async fn translate(&self, text: String) -> Result<String, ApiError> {
        let request = TranslateRequest { text: Some(text) };
        let response: TranslateResponse = self.post("/translate", &request).await?;
        Ok(response.translated_text)
    }
}
