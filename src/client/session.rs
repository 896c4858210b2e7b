use super::camera::FacingMode;

pub const TRANSLATE_LABEL: &str = "Translate";
pub const TRANSLATING_LABEL: &str = "Translating...";
pub const CAMERA_ERROR: &str = "Could not access camera. Please grant permission.";
pub const CHALLENGE_ERROR: &str = "An error occurred. Please try again.";
pub const TRANSLATE_ERROR: &str = "Could not translate.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Home,
    Scanning,
}

/// Where the client is in the capture flow, derived from [`SessionState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Home,
    /// Camera view, possibly with an error modal on top.
    Scanning,
    ChallengeShown,
    TranslationShown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslateButton {
    pub visible: bool,
    pub enabled: bool,
    pub label: &'static str,
}

impl Default for TranslateButton {
    fn default() -> Self {
        Self {
            visible: false,
            enabled: true,
            label: TRANSLATE_LABEL,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Modal {
    pub open: bool,
    /// Quoted challenge text or an error message.
    pub original: String,
    pub translated: Option<String>,
    pub translate: TranslateButton,
}

/// Everything the capture client remembers between user actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    pub view: View,
    pub facing_mode: FacingMode,
    /// Display-only horizontal flip of the preview.
    pub mirrored: bool,
    /// Preview brightness in percent, display-only.
    pub brightness: u16,
    /// Last generated challenge, the input of the next translation.
    pub original_text: String,
    pub modal: Modal,
    /// Cleared while a challenge request is in flight.
    pub challenge_enabled: bool,
    /// Inline message shown when the camera could not be acquired.
    pub camera_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            view: View::Home,
            facing_mode: FacingMode::Environment,
            mirrored: false,
            brightness: 100,
            original_text: String::new(),
            modal: Modal::default(),
            challenge_enabled: true,
            camera_error: None,
        }
    }
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        match self.view {
            View::Home => Phase::Home,
            View::Scanning if !self.modal.open => Phase::Scanning,
            View::Scanning if self.modal.translate.visible => Phase::ChallengeShown,
            View::Scanning if self.modal.translated.is_some() => Phase::TranslationShown,
            View::Scanning => Phase::Scanning,
        }
    }

    /// CSS filter applied to the preview.
    pub fn video_filter(&self) -> String {
        format!("brightness({})", f32::from(self.brightness) / 100.0)
    }

    pub(crate) fn show_challenge(&mut self, text: String) {
        self.modal = Modal {
            open: true,
            original: format!("\"{text}\""),
            translated: None,
            translate: TranslateButton {
                visible: true,
                ..TranslateButton::default()
            },
        };
        self.original_text = text;
    }

    pub(crate) fn show_challenge_error(&mut self) {
        self.modal = Modal {
            open: true,
            original: CHALLENGE_ERROR.to_string(),
            ..Modal::default()
        };
    }
}
