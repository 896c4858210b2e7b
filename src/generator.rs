use std::sync::Arc;

use crate::{error::GenerationError, model::TextModel};

/// Persona and output constraints shared by every challenge prompt.
pub const PERSONA: &str = "You are an actor playing the Malayalam movie character Dashamoolam Damu. \
Your only job is to create a funny, 1-2 sentence roast or challenge in Manglish. \
Your response must be ONLY the Manglish text. No explanation, no translation, no extra text, \
no brackets, and no Malayalam script.";

/// How the subject of a challenge is addressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    /// A person is in front of the camera: roast them.
    Roast,
    /// Anything else: challenge the object by name.
    Object,
}

impl Framing {
    pub fn for_label(label: &str) -> Self {
        if label.to_lowercase() == "person" {
            Framing::Roast
        } else {
            Framing::Object
        }
    }
}

pub fn challenge_prompt(label: &str) -> String {
    match Framing::for_label(label) {
        Framing::Roast => {
            format!("{PERSONA} The target is the person in front of you. Roast them.")
        }
        Framing::Object => {
            format!("{PERSONA} The target is an object. Challenge the {label}.")
        }
    }
}

/// Turns a detected label into a stylized challenge line.
pub struct ChallengeGenerator<M: TextModel> {
    model: Arc<M>,
}

impl<M: TextModel> ChallengeGenerator<M> {
    pub fn new(model: Arc<M>) -> Self {
        Self { model }
    }

    /// Returns the model's reply untouched. Failures are not retried.
    pub async fn generate(&self, label: &str) -> Result<String, GenerationError> {
        log::info!("Generating challenge for {:?}", label);
        self.model.generate(&challenge_prompt(label)).await
    }
}
