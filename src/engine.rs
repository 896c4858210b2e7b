use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{
    detector::ObjectDetector,
    error::{ChallengeError, TranslateError, ValidationError},
    generator::ChallengeGenerator,
    model::TextModel,
    translator::Translator,
};

/// A generated challenge together with telemetry for the two stages.
#[derive(Debug, Clone)]
pub struct Challenge {
    /// Label produced by the detector.
    pub label: String,
    /// Text produced by the model, unmodified.
    pub text: String,
    /// Timestamp when detection started.
    pub start_time: Instant,
    /// Time spent in the detector.
    pub detection_time: Duration,
    /// Time spent waiting for the model.
    pub generation_time: Duration,
}

/// Removes a leading `data:<mime>;base64,` marker if present.
pub fn strip_data_uri(payload: &str) -> &str {
    let payload = payload.trim();
    if !payload.starts_with("data:") {
        return payload;
    }
    match payload.split_once(',') {
        Some((header, body)) if header.ends_with(";base64") => body,
        _ => payload,
    }
}

/// Decodes a base64 image payload, with or without a data URI prefix.
pub fn decode_image(payload: &str) -> Result<Vec<u8>, ValidationError> {
    let encoded = strip_data_uri(payload);
    if encoded.is_empty() {
        return Err(ValidationError::MissingImage);
    }
    Ok(STANDARD.decode(encoded)?)
}

/// Sequences detection, generation and translation for the HTTP handlers.
///
/// The engine holds no per-request state; any number of requests may run
/// through it at once.
pub struct ChallengeEngine<D: ObjectDetector, M: TextModel> {
    detector: D,
    generator: ChallengeGenerator<M>,
    translator: Translator<M>,
}

impl<D: ObjectDetector, M: TextModel> ChallengeEngine<D, M> {
    /// Creates an engine; the generator and translator share `model`.
    pub fn new(detector: D, model: M) -> Self {
        let model = Arc::new(model);
        Self {
            detector,
            generator: ChallengeGenerator::new(model.clone()),
            translator: Translator::new(model),
        }
    }

    /// Detects the subject of `image_payload`, then generates a challenge for it.
    ///
    /// Generation only starts once detection has produced a label.
    pub async fn challenge(&self, image_payload: &str) -> Result<Challenge, ChallengeError> {
        let image = decode_image(image_payload)?;

        let start_time = Instant::now();
        let label = self.detector.detect(&image).await?;
        let detection_time = start_time.elapsed();
        log::debug!("Detected {:?} in {:?}", label, detection_time);

        let generation_start = Instant::now();
        let text = self.generator.generate(&label).await?;
        let generation_time = generation_start.elapsed();

        Ok(Challenge {
            label,
            text,
            start_time,
            detection_time,
            generation_time,
        })
    }

    pub async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        self.translator.translate(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{DetectionError, GenerationError},
        generator::challenge_prompt,
        model::testing::CannedModel,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedDetector {
        result: Result<&'static str, ()>,
        seen: Mutex<Vec<Vec<u8>>>,
    }

    impl FixedDetector {
        fn labelling(label: &'static str) -> Self {
            Self {
                result: Ok(label),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err(()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ObjectDetector for FixedDetector {
        async fn detect(&self, image: &[u8]) -> Result<String, DetectionError> {
            self.seen.lock().unwrap().push(image.to_vec());
            self.result
                .map(str::to_string)
                .map_err(|_| DetectionError::Stderr("boom".into()))
        }
    }

    #[test]
    fn strips_any_base64_data_uri() {
        assert_eq!(strip_data_uri("data:image/jpeg;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri("QUJD"), "QUJD");
        assert_eq!(strip_data_uri("data:text/plain,hi"), "data:text/plain,hi");
    }

    #[test]
    fn decodes_prefixed_and_bare_payloads() {
        assert_eq!(decode_image("data:image/jpeg;base64,QUJD").unwrap(), b"ABC");
        assert_eq!(decode_image("QUJD").unwrap(), b"ABC");
        assert!(matches!(
            decode_image("data:image/jpeg;base64,"),
            Err(ValidationError::MissingImage)
        ));
        assert!(matches!(
            decode_image("not base64!"),
            Err(ValidationError::InvalidImage(_))
        ));
    }

    #[tokio::test]
    async fn detection_feeds_generation() {
        let model = Arc::new(CannedModel::replying("Kuppi, ninne njan edukkum."));
        let engine = ChallengeEngine::new(FixedDetector::labelling("bottle"), model.clone());

        let challenge = engine
            .challenge("data:image/jpeg;base64,QUJD")
            .await
            .unwrap();

        assert_eq!(challenge.label, "bottle");
        assert_eq!(challenge.text, "Kuppi, ninne njan edukkum.");
        assert!(
            challenge.start_time.elapsed() >= challenge.detection_time + challenge.generation_time
        );
        assert_eq!(engine.detector.seen.lock().unwrap()[0], b"ABC");
        assert_eq!(model.prompts(), vec![challenge_prompt("bottle")]);
    }

    #[tokio::test]
    async fn failed_detection_skips_generation() {
        let model = Arc::new(CannedModel::replying("unused"));
        let engine = ChallengeEngine::new(FixedDetector::failing(), model.clone());

        assert!(matches!(
            engine.challenge("QUJD").await,
            Err(ChallengeError::Detection(_))
        ));
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn generation_failure_surfaces() {
        let engine = ChallengeEngine::new(FixedDetector::labelling("person"), CannedModel::failing());

        assert!(matches!(
            engine.challenge("QUJD").await,
            Err(ChallengeError::Generation(GenerationError::EmptyResponse))
        ));
    }

    #[tokio::test]
    async fn undecodable_payload_is_rejected_before_detection() {
        let engine = ChallengeEngine::new(FixedDetector::labelling("person"), CannedModel::failing());

        assert!(matches!(
            engine.challenge("%%%").await,
            Err(ChallengeError::Validation(_))
        ));
        assert!(engine.detector.seen.lock().unwrap().is_empty());
    }
}
