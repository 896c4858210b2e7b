//! Capture client: camera handling and the challenge/translate flow.
//!
//! The UI layer forwards user actions to [`CaptureClient`] and renders the
//! resulting [`SessionState`].

mod api;
mod camera;
mod session;

pub use api::{ApiError, ChallengeApi, HttpChallengeApi};
pub use camera::{Camera, CameraAccessError, CaptureError, FacingMode, MediaStream};
pub use session::{
    CAMERA_ERROR, CHALLENGE_ERROR, Modal, Phase, SessionState, TRANSLATE_ERROR, TRANSLATE_LABEL,
    TRANSLATING_LABEL, TranslateButton, View,
};

use std::sync::{Mutex, MutexGuard, PoisonError};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Camera(#[from] CameraAccessError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result of a user-triggered request.
#[derive(Debug)]
pub enum Trigger {
    /// The request completed and its result is on screen.
    Shown,
    /// The request failed; the modal shows a generic message.
    Failed(ClientError),
    /// The control was disabled, nothing was sent.
    Ignored,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Re-enables the challenge trigger however the request ends.
struct ChallengeGuard<'a>(&'a Mutex<SessionState>);

impl Drop for ChallengeGuard<'_> {
    fn drop(&mut self) {
        lock(self.0).challenge_enabled = true;
    }
}

/// Restores the translate affordance however the request ends.
struct TranslateGuard<'a>(&'a Mutex<SessionState>);

impl Drop for TranslateGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.0);
        state.modal.translate.enabled = true;
        state.modal.translate.label = TRANSLATE_LABEL;
    }
}

pub struct CaptureClient<C: Camera, A: ChallengeApi> {
    camera: C,
    api: A,
    state: Mutex<SessionState>,
    stream: Mutex<Option<Box<dyn MediaStream>>>,
}

impl<C: Camera, A: ChallengeApi> CaptureClient<C, A> {
    pub fn new(camera: C, api: A) -> Self {
        Self {
            camera,
            api,
            state: Mutex::new(SessionState::default()),
            stream: Mutex::new(None),
        }
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Snapshot of the current session.
    pub fn state(&self) -> SessionState {
        lock(&self.state).clone()
    }

    pub fn has_stream(&self) -> bool {
        lock(&self.stream).is_some()
    }

    fn release_stream(&self) {
        if let Some(mut stream) = lock(&self.stream).take() {
            stream.stop();
        }
    }

    /// Releases any current stream, then acquires one facing `facing`.
    async fn open_stream(&self, facing: FacingMode) -> Result<(), CameraAccessError> {
        self.release_stream();
        match self.camera.acquire(facing).await {
            Ok(stream) => {
                *lock(&self.stream) = Some(stream);
                lock(&self.state).camera_error = None;
                Ok(())
            }
            Err(e) => {
                log::error!("Error accessing {} camera: {}", facing.as_str(), e);
                lock(&self.state).camera_error = Some(CAMERA_ERROR.to_string());
                Err(e)
            }
        }
    }

    /// Home → Scanning. On failure the client stays on the home view.
    pub async fn start_scan(&self) -> Result<(), CameraAccessError> {
        let facing = lock(&self.state).facing_mode;
        self.open_stream(facing).await?;
        lock(&self.state).view = View::Scanning;
        Ok(())
    }

    /// Scanning → Home, releasing the camera.
    pub fn back(&self) {
        self.release_stream();
        lock(&self.state).view = View::Home;
    }

    /// Switches between front and rear cameras and reacquires the stream.
    ///
    /// Does nothing outside the scanner view.
    pub async fn flip_camera(&self) -> Result<(), CameraAccessError> {
        let facing = {
            let mut state = lock(&self.state);
            if state.view != View::Scanning {
                return Ok(());
            }
            state.facing_mode = state.facing_mode.toggled();
            state.facing_mode
        };
        self.open_stream(facing).await
    }

    pub fn toggle_mirror(&self) -> bool {
        let mut state = lock(&self.state);
        state.mirrored = !state.mirrored;
        state.mirrored
    }

    pub fn set_brightness(&self, percent: u16) {
        lock(&self.state).brightness = percent;
    }

    fn capture_frame(&self) -> Result<String, CaptureError> {
        let stream = lock(&self.stream);
        let jpeg = stream.as_ref().ok_or(CaptureError::NoStream)?.capture_jpeg()?;
        Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg)))
    }

    /// Captures a frame and asks the server for a challenge.
    ///
    /// Only one challenge is in flight at a time; triggering again while one
    /// is outstanding, or outside the scanner view, returns
    /// [`Trigger::Ignored`] without a network call.
    pub async fn challenge(&self) -> Trigger {
        {
            let mut state = lock(&self.state);
            if state.view != View::Scanning || !state.challenge_enabled {
                return Trigger::Ignored;
            }
            state.challenge_enabled = false;
        }
        let _guard = ChallengeGuard(&self.state);

        let result = match self.capture_frame() {
            Ok(image) => self.api.challenge(image).await.map_err(ClientError::from),
            Err(e) => Err(e.into()),
        };

        let mut state = lock(&self.state);
        match result {
            Ok(text) => {
                state.show_challenge(text);
                Trigger::Shown
            }
            Err(e) => {
                log::error!("Challenge request failed: {}", e);
                state.show_challenge_error();
                Trigger::Failed(e)
            }
        }
    }

    /// Asks the server to translate the last challenge.
    pub async fn translate(&self) -> Trigger {
        let text = {
            let mut state = lock(&self.state);
            let button = &mut state.modal.translate;
            if !button.visible || !button.enabled {
                return Trigger::Ignored;
            }
            button.enabled = false;
            button.label = TRANSLATING_LABEL;
            state.original_text.clone()
        };
        let _guard = TranslateGuard(&self.state);

        let result = self.api.translate(text).await;

        let mut state = lock(&self.state);
        match result {
            Ok(translated) => {
                state.modal.translated = Some(translated);
                state.modal.translate.visible = false;
                Trigger::Shown
            }
            Err(e) => {
                log::error!("Translation error: {}", e);
                state.modal.translated = Some(TRANSLATE_ERROR.to_string());
                Trigger::Failed(e.into())
            }
        }
    }

    /// Hides the modal; stored text is kept.
    pub fn close_modal(&self) {
        lock(&self.state).modal.open = false;
    }
}

impl<C: Camera, A: ChallengeApi> Drop for CaptureClient<C, A> {
    fn drop(&mut self) {
        self.release_stream();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };
    use tokio::sync::Notify;

    struct FakeStream {
        live: Arc<AtomicUsize>,
    }

    impl MediaStream for FakeStream {
        fn capture_jpeg(&self) -> Result<Vec<u8>, CaptureError> {
            Ok(b"ABC".to_vec())
        }

        fn stop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct FakeCamera {
        deny: AtomicBool,
        live: Arc<AtomicUsize>,
        requests: Mutex<Vec<FacingMode>>,
    }

    #[async_trait]
    impl Camera for FakeCamera {
        async fn acquire(
            &self,
            facing: FacingMode,
        ) -> Result<Box<dyn MediaStream>, CameraAccessError> {
            self.requests.lock().unwrap().push(facing);
            if self.deny.load(Ordering::SeqCst) {
                return Err(CameraAccessError("permission denied".into()));
            }
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                live: self.live.clone(),
            }))
        }
    }

    /// Answers every call; `challenge` optionally waits for `release`.
    #[derive(Default)]
    struct FakeApi {
        gated: bool,
        fail: AtomicBool,
        entered: Notify,
        release: Notify,
        challenges: Mutex<Vec<String>>,
        translations: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChallengeApi for FakeApi {
        async fn challenge(&self, image: String) -> Result<String, ApiError> {
            self.challenges.lock().unwrap().push(image);
            if self.gated {
                self.entered.notify_one();
                self.release.notified().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ApiError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
            }
            Ok("Eda mone, oru second.".into())
        }

        async fn translate(&self, text: String) -> Result<String, ApiError> {
            self.translations.lock().unwrap().push(text);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ApiError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
            }
            Ok("Hey kid, one second.".into())
        }
    }

    fn client() -> CaptureClient<FakeCamera, FakeApi> {
        CaptureClient::new(FakeCamera::default(), FakeApi::default())
    }

    #[tokio::test]
    async fn start_scan_and_back_manage_the_stream() {
        let client = client();
        client.start_scan().await.unwrap();
        assert_eq!(client.state().phase(), Phase::Scanning);
        assert_eq!(client.camera().live.load(Ordering::SeqCst), 1);

        client.back();
        assert_eq!(client.state().phase(), Phase::Home);
        assert!(!client.has_stream());
        assert_eq!(client.camera().live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn denied_camera_stays_home_with_inline_error() {
        let client = client();
        client.camera().deny.store(true, Ordering::SeqCst);

        assert!(client.start_scan().await.is_err());
        let state = client.state();
        assert_eq!(state.phase(), Phase::Home);
        assert_eq!(state.camera_error.as_deref(), Some(CAMERA_ERROR));
        assert!(!state.modal.open);
    }

    #[tokio::test]
    async fn flipping_twice_restores_facing_mode() {
        let client = client();
        client.start_scan().await.unwrap();

        client.flip_camera().await.unwrap();
        assert_eq!(client.state().facing_mode, FacingMode::User);
        client.flip_camera().await.unwrap();
        assert_eq!(client.state().facing_mode, FacingMode::Environment);

        assert_eq!(
            *client.camera().requests.lock().unwrap(),
            vec![FacingMode::Environment, FacingMode::User, FacingMode::Environment]
        );
        // Previous streams were released before each reacquisition.
        assert_eq!(client.camera().live.load(Ordering::SeqCst), 1);
        assert!(client.has_stream());
    }

    #[tokio::test]
    async fn home_view_neither_opens_the_camera_nor_calls_the_server() {
        let client = client();

        client.flip_camera().await.unwrap();
        assert!(matches!(client.challenge().await, Trigger::Ignored));

        let state = client.state();
        assert_eq!(state.phase(), Phase::Home);
        assert_eq!(state.facing_mode, FacingMode::Environment);
        assert!(!state.modal.open);
        assert!(state.challenge_enabled);
        assert!(!client.has_stream());
        assert!(client.camera().requests.lock().unwrap().is_empty());
        assert!(client.api().challenges.lock().unwrap().is_empty());

        // Leaving the scanner puts the same guard back in place.
        client.start_scan().await.unwrap();
        client.back();
        assert!(matches!(client.challenge().await, Trigger::Ignored));
        assert!(client.api().challenges.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mirror_and_brightness_are_display_only() {
        let client = client();
        assert!(client.toggle_mirror());
        assert!(!client.toggle_mirror());
        assert!(!client.state().mirrored);

        client.set_brightness(80);
        assert_eq!(client.state().video_filter(), "brightness(0.8)");
    }

    #[tokio::test]
    async fn challenge_then_translate() {
        let client = client();
        client.start_scan().await.unwrap();

        assert!(matches!(client.challenge().await, Trigger::Shown));
        assert_eq!(
            client.api().challenges.lock().unwrap()[0],
            "data:image/jpeg;base64,QUJD"
        );
        let state = client.state();
        assert_eq!(state.phase(), Phase::ChallengeShown);
        assert_eq!(state.original_text, "Eda mone, oru second.");
        assert_eq!(state.modal.original, "\"Eda mone, oru second.\"");
        assert!(state.challenge_enabled);

        assert!(matches!(client.translate().await, Trigger::Shown));
        assert_eq!(
            *client.api().translations.lock().unwrap(),
            vec!["Eda mone, oru second.".to_string()]
        );
        let state = client.state();
        assert_eq!(state.phase(), Phase::TranslationShown);
        assert_eq!(state.modal.translated.as_deref(), Some("Hey kid, one second."));
        assert!(state.modal.translate.enabled);
        assert_eq!(state.modal.translate.label, TRANSLATE_LABEL);

        // The affordance is hidden now.
        assert!(matches!(client.translate().await, Trigger::Ignored));
    }

    #[tokio::test]
    async fn second_trigger_while_in_flight_sends_nothing() {
        let client = CaptureClient::new(
            FakeCamera::default(),
            FakeApi {
                gated: true,
                ..FakeApi::default()
            },
        );
        client.start_scan().await.unwrap();

        let (first, second) = tokio::join!(client.challenge(), async {
            client.api().entered.notified().await;
            let second = client.challenge().await;
            client.api().release.notify_one();
            second
        });

        assert!(matches!(first, Trigger::Shown));
        assert!(matches!(second, Trigger::Ignored));
        assert_eq!(client.api().challenges.lock().unwrap().len(), 1);
        assert!(client.state().challenge_enabled);
    }

    #[tokio::test]
    async fn failed_challenge_shows_generic_error_and_reenables() {
        let client = client();
        client.start_scan().await.unwrap();
        client.api().fail.store(true, Ordering::SeqCst);

        assert!(matches!(client.challenge().await, Trigger::Failed(ClientError::Api(_))));
        let state = client.state();
        assert!(state.modal.open);
        assert_eq!(state.modal.original, CHALLENGE_ERROR);
        assert!(!state.modal.translate.visible);
        assert!(state.challenge_enabled);
    }

    #[tokio::test]
    async fn challenge_without_stream_fails_before_the_network() {
        let client = client();
        client.start_scan().await.unwrap();
        client.camera().deny.store(true, Ordering::SeqCst);
        assert!(client.flip_camera().await.is_err());
        assert!(!client.has_stream());

        assert!(matches!(
            client.challenge().await,
            Trigger::Failed(ClientError::Capture(CaptureError::NoStream))
        ));
        assert!(client.api().challenges.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_translation_keeps_the_affordance() {
        let client = client();
        client.start_scan().await.unwrap();
        client.challenge().await;
        client.api().fail.store(true, Ordering::SeqCst);

        assert!(matches!(client.translate().await, Trigger::Failed(_)));
        let state = client.state();
        assert_eq!(state.modal.translated.as_deref(), Some(TRANSLATE_ERROR));
        assert!(state.modal.translate.visible);
        assert!(state.modal.translate.enabled);
        assert_eq!(state.modal.translate.label, TRANSLATE_LABEL);
    }

    #[tokio::test]
    async fn closing_the_modal_keeps_the_text() {
        let client = client();
        client.start_scan().await.unwrap();
        client.challenge().await;

        client.close_modal();
        let state = client.state();
        assert!(!state.modal.open);
        assert_eq!(state.phase(), Phase::Scanning);
        assert_eq!(state.original_text, "Eda mone, oru second.");
    }
}
