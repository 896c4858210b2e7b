//! HTTP surface: `POST /challenge`, `POST /translate` and the static client.

use std::{path::Path, sync::Arc};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::{
    detector::ObjectDetector,
    engine::ChallengeEngine,
    error::{ChallengeError, TranslateError, ValidationError},
    messages::{
        ChallengeRequest, ChallengeResponse, ErrorResponse, TranslateRequest, TranslateResponse,
    },
    model::TextModel,
};

/// Largest request body accepted, enough for a full-resolution JPEG frame.
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

const CHALLENGE_FAILED: &str = "Failed to process challenge.";
const TRANSLATE_FAILED: &str = "Failed to process translation.";

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn rejected(rejection: JsonRejection) -> Response {
    log::warn!("Rejected request body: {}", rejection);
    bad_request(rejection.body_text())
}

async fn post_challenge<D: ObjectDetector + 'static, M: TextModel + 'static>(
    State(engine): State<Arc<ChallengeEngine<D, M>>>,
    payload: Result<Json<ChallengeRequest>, JsonRejection>,
) -> Response {
    log::info!("Received a challenge request");

    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => return rejected(rejection),
    };
    let Some(image) = payload.image.filter(|image| !image.is_empty()) else {
        return bad_request(ValidationError::MissingImage.to_string());
    };

    match engine.challenge(&image).await {
        Ok(challenge) => {
            log::info!(
                "Generated for {:?} in {:?} (detect {:?}, generate {:?}): {:?}",
                challenge.label,
                challenge.start_time.elapsed(),
                challenge.detection_time,
                challenge.generation_time,
                challenge.text
            );
            Json(ChallengeResponse {
                text: challenge.text,
            })
            .into_response()
        }
        Err(ChallengeError::Validation(e)) => {
            log::warn!("Invalid challenge request: {}", e);
            bad_request(e.to_string())
        }
        Err(e) => {
            log::error!("Challenge failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, CHALLENGE_FAILED).into_response()
        }
    }
}

async fn post_translate<D: ObjectDetector + 'static, M: TextModel + 'static>(
    State(engine): State<Arc<ChallengeEngine<D, M>>>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => return rejected(rejection),
    };
    let text = payload.text.unwrap_or_default();

    match engine.translate(&text).await {
        Ok(translated_text) => {
            log::info!("Translation generated: {:?}", translated_text);
            Json(TranslateResponse { translated_text }).into_response()
        }
        Err(TranslateError::Validation(e)) => {
            log::warn!("Invalid translate request: {}", e);
            bad_request(e.to_string())
        }
        Err(e) => {
            log::error!("Translation failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, TRANSLATE_FAILED).into_response()
        }
    }
}

/// Builds the API router around `engine`.
pub fn api<D: ObjectDetector + 'static, M: TextModel + 'static>(
    engine: Arc<ChallengeEngine<D, M>>,
) -> Router {
    Router::new()
        .route("/challenge", post(post_challenge::<D, M>))
        .route("/translate", post(post_translate::<D, M>))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

/// The API router with the capture client's static files served from `public_dir`.
pub fn router<D: ObjectDetector + 'static, M: TextModel + 'static>(
    engine: Arc<ChallengeEngine<D, M>>,
    public_dir: &Path,
) -> Router {
    api(engine).fallback_service(ServeDir::new(public_dir))
}
