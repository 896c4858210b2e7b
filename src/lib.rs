//! Point a camera at something and get challenged by it.
//!
//! A captured frame goes through an [`ObjectDetector`] to get a label, the
//! [`ChallengeGenerator`] turns the label into a short Manglish roast via a
//! [`TextModel`], and the [`Translator`] can render that line in English.
//! [`ChallengeEngine`] sequences these stages and [`http::router`] exposes
//! them as `POST /challenge` and `POST /translate`.

pub mod client;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod http;
pub mod messages;
pub mod model;
pub mod translator;

pub use detector::{ObjectDetector, SubprocessDetector};
pub use engine::{Challenge, ChallengeEngine};
pub use error::{ChallengeError, DetectionError, GenerationError, TranslateError, ValidationError};
pub use gemini::GeminiModel;
pub use generator::ChallengeGenerator;
pub use model::TextModel;
pub use translator::Translator;
